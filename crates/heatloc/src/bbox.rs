/// A type-safe bounding box in heatmap pixel coordinates.
///
/// It is a wrapper around a tuple of four `f64` values representing the coordinates of the bounding box.
/// The type parameter `T` is used to specify the format of the bounding box, and is used to enforce type safety.
///
/// The `x` coordinates index heatmap rows (axis 0) and the `y` coordinates index heatmap columns
/// (axis 1), the same way candidate corners index the integral image.
///
/// # Conversion
///
/// The bounding box can be converted between different formats using the [`ConvertBbox`] trait.
///
/// ```
/// use heatloc::bbox::*;
///
/// let xyxy = Bbox::xyxy(4.0, 4.0, 10.0, 10.0);
/// let center: Bbox<Cxcywh> = xyxy.convert();
///
/// assert_eq!(center.inner, (7.0, 7.0, 6.0, 6.0));
/// ```
///
/// # Formats
///
/// The following formats are supported:
///
/// - [`Xyxy`] (xmin, ymin, xmax, ymax), the format boxes are stored in
/// - [`Cxcywh`] (center_x, center_y, width, height), used for center distances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox<T> {
    pub inner: (f64, f64, f64, f64),
    _marker: std::marker::PhantomData<T>,
}

impl<T> Bbox<T> {
    /// Create a new bounding box from the given coordinates.
    fn new(bbox: (f64, f64, f64, f64)) -> Self {
        Bbox {
            inner: bbox,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Bbox<T>
where
    Bbox<T>: ConvertBbox<Xyxy>,
{
    /// Compute the area of the bounding box.
    pub fn area(&self) -> f64 {
        let (x1, y1, x2, y2) = ConvertBbox::<Xyxy>::convert(self).inner;
        (x2 - x1) * (y2 - y1)
    }

    /// Compute the intersection area between two bounding boxes.
    ///
    /// The intersection area is computed as the area of the overlap between the two bounding boxes.
    /// If the bounding boxes do not overlap, or either box has a negative extent, the intersection
    /// area is `0.0`. Boxes that only touch have an intersection of `0.0` as well.
    pub fn intersection<S>(&self, other: &S) -> f64
    where
        S: ConvertBbox<Xyxy>,
    {
        let (x1, y1, x2, y2) = ConvertBbox::<Xyxy>::convert(self).inner;
        let (x3, y3, x4, y4) = other.convert().inner;

        let dx = x2.min(x4) - x1.max(x3);
        let dy = y2.min(y4) - y1.max(y3);

        if dx >= 0.0 && dy >= 0.0 {
            dx * dy
        } else {
            0.0
        }
    }

    /// Compute the union area between two bounding boxes.
    ///
    /// The union area is computed as the sum of the areas of the two bounding boxes minus the
    /// intersection area.
    pub fn union<S>(&self, other: &S) -> f64
    where
        S: ConvertBbox<Xyxy>,
    {
        let area1 = ConvertBbox::<Xyxy>::convert(self).area();
        let area2 = other.convert().area();
        area1 + area2 - self.intersection(other)
    }

    /// Compute the intersection over union (IoU) between two bounding boxes.
    ///
    /// Returns `0.0` when the boxes do not intersect, so degenerate boxes never divide by zero.
    pub fn iou<S>(&self, other: &S) -> f64
    where
        S: ConvertBbox<Xyxy>,
    {
        let intersect = self.intersection(other);
        if intersect == 0.0 {
            return 0.0;
        }

        intersect / self.union(other)
    }

    /// Fraction of this box that is covered by `other`.
    ///
    /// Unlike [`Bbox::iou`] this is asymmetric: a small box fully inside a large one has an
    /// intersection over left of `1.0`, no matter how large the other box is.
    pub fn intersection_over_left<S>(&self, other: &S) -> f64
    where
        S: ConvertBbox<Xyxy>,
    {
        let intersect = self.intersection(other);
        if intersect == 0.0 {
            return 0.0;
        }

        intersect / self.area()
    }

    /// Euclidean distance between the centers of two bounding boxes.
    pub fn center_distance<S>(&self, other: &S) -> f64
    where
        S: ConvertBbox<Cxcywh>,
        Bbox<T>: ConvertBbox<Cxcywh>,
    {
        let (cx1, cy1, _, _) = ConvertBbox::<Cxcywh>::convert(self).inner;
        let (cx2, cy2, _, _) = other.convert().inner;

        (cx1 - cx2).hypot(cy1 - cy2)
    }
}

impl<T> From<Bbox<T>> for (f64, f64, f64, f64) {
    fn from(bbox: Bbox<T>) -> Self {
        bbox.inner
    }
}

impl From<[f64; 4]> for Bbox<Xyxy> {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Bbox::xyxy(x1, y1, x2, y2)
    }
}

impl From<Bbox<Xyxy>> for [f64; 4] {
    fn from(bbox: Bbox<Xyxy>) -> Self {
        let (x1, y1, x2, y2) = bbox.inner;
        [x1, y1, x2, y2]
    }
}

/// Trait for converting a bounding box to a different representation.
pub trait ConvertBbox<T> {
    fn convert(&self) -> Bbox<T>;
}

/// Marker type for bounding boxes with coordinates of the top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyxy;

impl Bbox<Xyxy> {
    /// Create a bounding box from the coordinates of the top-left and bottom-right corners.
    pub fn xyxy(x1: f64, y1: f64, x2: f64, y2: f64) -> Bbox<Xyxy> {
        Bbox::new((x1, y1, x2, y2))
    }

    /// Create a bounding box from integer candidate corners.
    pub fn from_corners(start: (usize, usize), end: (usize, usize)) -> Bbox<Xyxy> {
        Bbox::new((start.0 as f64, start.1 as f64, end.0 as f64, end.1 as f64))
    }

    /// Extent of the box along the `x` axis.
    pub fn width(&self) -> f64 {
        self.inner.2 - self.inner.0
    }

    /// Extent of the box along the `y` axis.
    pub fn height(&self) -> f64 {
        self.inner.3 - self.inner.1
    }
}

impl ConvertBbox<Xyxy> for Bbox<Xyxy> {
    fn convert(&self) -> Bbox<Xyxy> {
        *self
    }
}

impl ConvertBbox<Cxcywh> for Bbox<Xyxy> {
    fn convert(&self) -> Bbox<Cxcywh> {
        let (x1, y1, x2, y2) = self.inner;
        Bbox::new(((x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1))
    }
}

/// Marker type for bounding boxes with coordinates of the center and the width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cxcywh;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_xyxy() {
        let bbox1 = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);
        let bbox2 = Bbox::xyxy(5.0, 5.0, 15.0, 15.0);

        assert_eq!(bbox1.intersection(&bbox2), 25.0);
        assert_eq!(bbox1.union(&bbox2), 175.0);
        assert_eq!(bbox1.iou(&bbox2), 25.0 / 175.0);
    }

    #[test]
    fn convert_to_center() {
        let center: Bbox<Cxcywh> = Bbox::xyxy(2.0, 4.0, 12.0, 10.0).convert();

        assert_eq!(center.inner, (7.0, 7.0, 10.0, 6.0));
    }

    #[test]
    fn intersection_is_symmetric_and_self_area() {
        let boxes = [
            Bbox::xyxy(0.0, 0.0, 10.0, 10.0),
            Bbox::xyxy(3.0, 4.0, 12.0, 7.0),
            Bbox::xyxy(9.0, 1.0, 20.0, 30.0),
            Bbox::xyxy(2.0, 2.0, 2.0, 8.0),
        ];

        for a in &boxes {
            assert_eq!(a.intersection(a), a.area());
            for b in &boxes {
                assert_eq!(a.intersection(b), b.intersection(a));
            }
        }
    }

    #[test]
    fn iou_is_bounded_and_one_for_identical() {
        let a = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);
        let b = Bbox::xyxy(2.0, 3.0, 14.0, 9.0);
        let c = Bbox::xyxy(0.0, 0.0, 10.0, 11.0);

        assert_eq!(a.iou(&a), 1.0);
        for (x, y) in [(a, b), (b, c), (a, c)] {
            let iou = x.iou(&y);
            assert!((0.0..1.0).contains(&iou), "iou out of range: {iou}");
        }
    }

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = Bbox::xyxy(0.0, 0.0, 2.0, 2.0);
        let b = Bbox::xyxy(5.0, 5.0, 7.0, 7.0);

        assert_eq!(a.intersection(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.intersection_over_left(&b), 0.0);
    }

    #[test]
    fn malformed_boxes_do_not_overlap() {
        let a = Bbox::xyxy(10.0, 10.0, 0.0, 0.0);
        let b = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);

        assert_eq!(a.intersection(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn degenerate_box_has_zero_overlap() {
        let line = Bbox::xyxy(5.0, 0.0, 5.0, 10.0);
        let b = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);

        assert_eq!(line.intersection(&b), 0.0);
        assert_eq!(line.iou(&b), 0.0);
        assert_eq!(line.intersection_over_left(&b), 0.0);
    }

    #[test]
    fn intersection_over_left_is_asymmetric() {
        let small = Bbox::xyxy(2.0, 2.0, 4.0, 4.0);
        let large = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);

        assert_eq!(small.intersection_over_left(&large), 1.0);
        assert_eq!(large.intersection_over_left(&small), 0.04);
    }

    #[test]
    fn center_distance() {
        let a = Bbox::xyxy(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.center_distance(&a), 0.0);

        let b = Bbox::xyxy(3.0, 4.0, 13.0, 14.0);
        assert_eq!(a.center_distance(&b), 5.0);
        assert_eq!(b.center_distance(&a), 5.0);
    }
}
