use std::cmp::Ordering;

use ndarray::{ArrayView1, ArrayView2};

/// Applies Non-Maximum Suppression (NMS) to the boxes spanned by `starts` and `ends`.
///
/// Boxes are selected greedily by descending score. After each selection, every remaining box
/// that overlaps the selected box by more than `threshold` is discarded. The overlap is the
/// intersection divided by the area of the remaining box, so a box mostly contained in a better
/// scoring box is suppressed even when the better box is much larger.
///
/// Areas and intersections count pixels inclusively, `(x2 - x1 + 1) * (y2 - y1 + 1)`.
/// Note that this differs from the exclusive convention in [`crate::bbox`]; which of the two
/// was intended is open, switching would change which boxes survive.
///
/// Equal scores are selected in order of their index, which makes the suppression idempotent:
/// running it again on the kept boxes keeps all of them.
///
/// Returns the indices of the kept boxes, in selection order (highest score first).
pub fn non_max_suppression(
    starts: ArrayView2<usize>,
    ends: ArrayView2<usize>,
    scores: ArrayView1<f64>,
    threshold: f64,
) -> Vec<usize> {
    debug_assert_eq!(starts.nrows(), scores.len());
    debug_assert_eq!(ends.nrows(), scores.len());

    let corners = |i: usize| {
        (
            starts[[i, 0]] as f64,
            starts[[i, 1]] as f64,
            ends[[i, 0]] as f64,
            ends[[i, 1]] as f64,
        )
    };
    let areas: Vec<f64> = (0..scores.len())
        .map(|i| {
            let (x1, y1, x2, y2) = corners(i);
            (x2 - x1 + 1.0) * (y2 - y1 + 1.0)
        })
        .collect();

    // ascending by score, ties with the higher index first, so the best box is always last
    let mut remaining: Vec<usize> = (0..scores.len()).collect();
    remaining.sort_by(|&a, &b| match scores[a].total_cmp(&scores[b]) {
        Ordering::Equal => b.cmp(&a),
        ordering => ordering,
    });

    let mut picks = Vec::new();
    while let Some(best) = remaining.pop() {
        picks.push(best);

        let (bx1, by1, bx2, by2) = corners(best);
        remaining.retain(|&other| {
            let (x1, y1, x2, y2) = corners(other);
            let w = (bx2.min(x2) - bx1.max(x1) + 1.0).max(0.0);
            let h = (by2.min(y2) - by1.max(y1) + 1.0).max(0.0);

            (w * h) / areas[other] <= threshold
        });
    }

    picks
}
