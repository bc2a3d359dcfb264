//! Spatial reference handling
//!
//! polyclean never reprojects: the output layer carries whatever
//! spatial reference the source declared, verbatim. A CRS is therefore
//! held opaquely, as the identification the source format provided.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A spatial reference system, preserved for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    /// An EPSG authority code.
    Epsg(u32),
    /// A full WKT definition, for sources without an authority code.
    Wkt(String),
}

impl Crs {
    /// WGS84 geographic coordinates (EPSG:4326), the reference system
    /// GeoJSON mandates.
    pub fn wgs84() -> Self {
        Crs::Epsg(4326)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            // WKT definitions run long; show the leading name part.
            Crs::Wkt(wkt) => match wkt.char_indices().nth(60) {
                Some((pos, _)) => write!(f, "{}...", &wkt[..pos]),
                None => f.write_str(wkt),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_epsg() {
        assert_eq!(Crs::wgs84().to_string(), "EPSG:4326");
        assert_eq!(Crs::Epsg(32719).to_string(), "EPSG:32719");
    }

    #[test]
    fn test_display_truncates_long_wkt() {
        let wkt = format!("PROJCS[\"{}\"]", "x".repeat(100));
        let shown = Crs::Wkt(wkt).to_string();
        assert!(shown.ends_with("..."));
        assert!(shown.len() <= 64);
    }

    #[test]
    fn test_display_short_wkt_shown_whole() {
        let crs = Crs::Wkt("LOCAL_CS[\"meters\"]".into());
        assert_eq!(crs.to_string(), "LOCAL_CS[\"meters\"]");
    }
}
