//! I/O operations for reading and writing vector datasets

mod driver;
#[cfg(feature = "gdal")]
mod gdal_io;
#[cfg(not(feature = "gdal"))]
mod geojson_io;

pub use driver::guess_driver;

#[cfg(feature = "gdal")]
pub use gdal_io::{read_vector, select_fids_where, write_vector};

#[cfg(not(feature = "gdal"))]
pub use geojson_io::{read_vector, select_fids_where, write_vector};
