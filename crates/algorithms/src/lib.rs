//! # polyclean algorithms
//!
//! Vector cleanup algorithms for polyclean.
//!
//! ## Available algorithms
//!
//! - **eliminate**: absorb selected polygons (typically slivers from
//!   overlay or generalization) into a touching neighbor chosen by a
//!   merge policy
//! - **explode**: split multi-part geometries into single-part features

pub mod eliminate;
pub mod explode;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::eliminate::{
        eliminate, parse_fid_list, select_by_predicate, Eliminate, EliminateParams,
        EliminateSummary, MergePolicy, VictimSpec,
    };
    pub use crate::explode::{explode, Explode, ExplodeSummary};
    pub use polyclean_core::prelude::*;
}
