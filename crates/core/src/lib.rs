//! # polyclean core
//!
//! Core types and I/O for the polyclean vector-cleanup toolkit.
//!
//! This crate provides:
//! - `VectorLayer`: in-memory vector layer with attribute filtering
//! - `Feature` / `Schema` / `AttributeValue`: the vector data model
//! - `Crs`: opaque coordinate reference system value
//! - Attribute filter expressions (a restricted WHERE dialect)
//! - File I/O: GeoJSON natively, everything else via the `gdal` feature

pub mod crs;
pub mod error;
pub mod io;
pub mod vector;

pub use crs::Crs;
pub use error::{Error, Result};
pub use vector::{Feature, Fid, Schema, VectorLayer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::vector::{
        AttributeValue, Feature, FieldDef, FieldType, Fid, GeometryType, Schema, VectorLayer,
    };
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in polyclean.
///
/// Algorithms are pure functions that transform input data according to
/// parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
