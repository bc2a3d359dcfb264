//! Output driver selection by destination extension

use crate::error::{Error, Result};
use std::path::Path;
use tracing::warn;

/// Map a destination path's extension to the candidate vector drivers
/// that can create it. Short names follow GDAL conventions so the table
/// is meaningful to both backends.
fn drivers_for_extension(ext: &str) -> &'static [&'static str] {
    match ext {
        "shp" | "dbf" => &["ESRI Shapefile"],
        "geojson" | "json" => &["GeoJSON"],
        "gpkg" => &["GPKG"],
        "sqlite" | "db" => &["SQLite"],
        "fgb" => &["FlatGeobuf"],
        "gml" => &["GML"],
        "kml" => &["KML", "LIBKML"],
        "csv" => &["CSV"],
        "tab" | "mif" => &["MapInfo File"],
        _ => &[],
    }
}

/// Guess the output driver for a destination path.
///
/// Ambiguous extensions pick the first matching driver and warn; an
/// unrecognized extension is a configuration error.
pub fn guess_driver(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let candidates = drivers_for_extension(&ext);
    match *candidates {
        [] => Err(Error::UnknownDriver(path.display().to_string())),
        [single] => Ok(single),
        [first, ..] => {
            warn!(
                "Several drivers match extension '.{}'; using {}",
                ext, first
            );
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_common_extensions() {
        assert_eq!(
            guess_driver(&PathBuf::from("out.shp")).unwrap(),
            "ESRI Shapefile"
        );
        assert_eq!(guess_driver(&PathBuf::from("out.gpkg")).unwrap(), "GPKG");
        assert_eq!(
            guess_driver(&PathBuf::from("out.GeoJSON")).unwrap(),
            "GeoJSON"
        );
    }

    #[test]
    fn test_ambiguous_extension_picks_first() {
        assert_eq!(guess_driver(&PathBuf::from("out.kml")).unwrap(), "KML");
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            guess_driver(&PathBuf::from("out.xyz")),
            Err(Error::UnknownDriver(_))
        ));
        assert!(guess_driver(&PathBuf::from("noextension")).is_err());
    }
}
