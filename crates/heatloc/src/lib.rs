//! Localize objects in dense heatmaps by scoring a fixed template of candidate boxes,
//! and evaluate the resulting boxes against ground truth.
//!
//! The entry point is the [`RegionSelector`](region::RegionSelector), which turns a heatmap
//! into scored [`Regions`](region::Regions). The [`eval`] module scores predicted boxes offline.

pub mod bbox;
pub mod cache;
pub mod candidates;
pub mod config;
mod error;
pub mod eval;
pub mod integral;
pub mod nms;
pub mod region;

pub use error::{Error, Result};

#[allow(missing_docs)]
pub mod prelude {
    pub use crate::bbox::{Bbox, ConvertBbox, Cxcywh, Xyxy};
    pub use crate::cache::CandidateCache;
    pub use crate::candidates::{CandidateGenerator, CandidateSet};
    pub use crate::config::{Config, HeatlocConfig};
    pub use crate::eval::{DetectionLabels, EvalRecord, EvalRecords, EvalSummary};
    pub use crate::region::{Detection, RegionSelector, Regions};
    pub use crate::{Error, Result};
}
