use geo::{MultiPolygon, Point};
use std::fmt;

/// Coordinate reference frame of a geometry set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326, CRS:84)
    Geographic,
    /// Web Mercator metres (EPSG:3857)
    WebMercator,
}

impl Crs {
    /// Parse an authority code such as `EPSG:4326` (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" => Some(Crs::Geographic),
            "EPSG:3857" | "EPSG:900913" => Some(Crs::WebMercator),
            _ => None,
        }
    }

    /// Classify the WKT found in a shapefile `.prj` sidecar.
    ///
    /// Only the two frames this tool understands are recognised; any other
    /// projected system yields `None`.
    pub fn from_prj_wkt(wkt: &str) -> Option<Self> {
        let wkt = wkt.trim_start();
        if wkt.starts_with("GEOGCS") || wkt.starts_with("GEOGCRS") {
            return Some(Crs::Geographic);
        }
        let upper = wkt.to_uppercase();
        let web_mercator = upper.contains("MERCATOR_AUXILIARY_SPHERE")
            || upper.contains("PSEUDO-MERCATOR")
            || upper.contains("POPULAR VISUALISATION")
            || upper.contains("\"EPSG\",\"3857\"")
            || upper.contains("\"EPSG\",3857");
        web_mercator.then_some(Crs::WebMercator)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => write!(f, "EPSG:4326"),
            Crs::WebMercator => write!(f, "EPSG:3857"),
        }
    }
}

/// One row of the census table.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictRecord {
    pub id: String,
    pub name: String,
    // Population change; `None` when the cell was empty or not numeric
    pub change: Option<f64>,
}

/// One district boundary, possibly multi-part.
#[derive(Debug, Clone)]
pub struct DistrictGeometry {
    pub id: String,
    // Name attribute of the geometry source, if configured
    pub name: Option<String>,
    pub boundary: MultiPolygon<f64>,
    pub crs: Crs,
}

/// A geometry with its matched record (if any) and derived encodings.
#[derive(Debug, Clone)]
pub struct JoinedDistrict {
    pub geometry: DistrictGeometry,
    pub record: Option<DistrictRecord>,
    pub change: f64,
    pub centroid: Option<Point<f64>>,
    pub marker_size: f64,
    pub color: MarkerColor,
}

impl JoinedDistrict {
    /// Hover label name: record name, then geometry name, then identifier.
    /// Blank names count as missing.
    pub fn display_name(&self) -> &str {
        self.record
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .or(self
                .geometry
                .name
                .as_deref()
                .filter(|name| !name.trim().is_empty()))
            .unwrap_or(self.geometry.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Positive,
    Negative,
}

impl MarkerColor {
    pub fn css(&self) -> &'static str {
        match self {
            MarkerColor::Positive => "red",
            MarkerColor::Negative => "blue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_from_code() {
        assert_eq!(Crs::from_code("EPSG:4326"), Some(Crs::Geographic));
        assert_eq!(Crs::from_code("crs:84"), Some(Crs::Geographic));
        assert_eq!(Crs::from_code(" epsg:3857 "), Some(Crs::WebMercator));
        assert_eq!(Crs::from_code("EPSG:900913"), Some(Crs::WebMercator));
        assert_eq!(Crs::from_code("EPSG:32718"), None);
    }

    #[test]
    fn test_crs_from_prj() {
        let wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(Crs::from_prj_wkt(wgs84), Some(Crs::Geographic));

        let mercator = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984"],PROJECTION["Mercator_Auxiliary_Sphere"]]"#;
        assert_eq!(Crs::from_prj_wkt(mercator), Some(Crs::WebMercator));

        let utm = r#"PROJCS["WGS_1984_UTM_Zone_18S",GEOGCS["GCS_WGS_1984"],PROJECTION["Transverse_Mercator"]]"#;
        assert_eq!(Crs::from_prj_wkt(utm), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let geometry = DistrictGeometry {
            id: "150101".to_string(),
            name: Some("LIMA".to_string()),
            boundary: MultiPolygon::new(vec![]),
            crs: Crs::WebMercator,
        };
        let mut joined = JoinedDistrict {
            geometry,
            record: None,
            change: 0.0,
            centroid: None,
            marker_size: 0.0,
            color: MarkerColor::Negative,
        };
        assert_eq!(joined.display_name(), "LIMA");

        joined.geometry.name = None;
        assert_eq!(joined.display_name(), "150101");

        joined.record = Some(DistrictRecord {
            id: "150101".to_string(),
            name: "Lima".to_string(),
            change: Some(-12.0),
        });
        assert_eq!(joined.display_name(), "Lima");
    }

    #[test]
    fn test_display_name_skips_blank_names() {
        let mut joined = JoinedDistrict {
            geometry: DistrictGeometry {
                id: "080101".to_string(),
                name: Some("CUSCO".to_string()),
                boundary: MultiPolygon::new(vec![]),
                crs: Crs::WebMercator,
            },
            record: Some(DistrictRecord {
                id: "080101".to_string(),
                name: String::new(),
                change: Some(1234.0),
            }),
            change: 1234.0,
            centroid: None,
            marker_size: 0.0,
            color: MarkerColor::Positive,
        };
        assert_eq!(joined.display_name(), "CUSCO");

        joined.geometry.name = Some("  ".to_string());
        assert_eq!(joined.display_name(), "080101");
    }
}
