//! Reprojection of district boundaries into Web Mercator.
//!
//! Centroids and extents are computed in the projected frame; on raw
//! longitude/latitude they would not be area-weighted.

use crate::types::{Crs, DistrictGeometry};
use geo::{Coord, MapCoords};
use std::f64::consts::PI;
use tracing::info;

/// WGS84 semi-major axis used by the spherical Web Mercator.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which Web Mercator becomes a square world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Forward spherical Mercator: degrees in, metres out.
pub fn lon_lat_to_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: EARTH_RADIUS * coord.x.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln(),
    }
}

impl DistrictGeometry {
    /// Copy of this geometry in Web Mercator. Already-projected input is
    /// returned as is.
    pub fn to_web_mercator(self) -> DistrictGeometry {
        match self.crs {
            Crs::WebMercator => self,
            Crs::Geographic => DistrictGeometry {
                boundary: self.boundary.map_coords(lon_lat_to_web_mercator),
                crs: Crs::WebMercator,
                ..self
            },
        }
    }
}

/// Reproject a whole geometry set, preserving order.
pub fn reproject(geometries: Vec<DistrictGeometry>) -> Vec<DistrictGeometry> {
    let geographic = geometries
        .iter()
        .filter(|g| g.crs == Crs::Geographic)
        .count();
    info!(
        "Reprojecting {} of {} geometries to {}",
        geographic,
        geometries.len(),
        Crs::WebMercator
    );

    geometries
        .into_iter()
        .map(DistrictGeometry::to_web_mercator)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn square(crs: Crs) -> DistrictGeometry {
        DistrictGeometry {
            id: "010101".to_string(),
            name: None,
            boundary: MultiPolygon::new(vec![polygon![
                (x: -77.0, y: -12.0),
                (x: -76.0, y: -12.0),
                (x: -76.0, y: -11.0),
                (x: -77.0, y: -11.0),
                (x: -77.0, y: -12.0),
            ]]),
            crs,
        }
    }

    #[test]
    fn test_origin_maps_to_origin() {
        let c = lon_lat_to_web_mercator(Coord { x: 0.0, y: 0.0 });
        assert!(close(c.x, 0.0, 1e-9));
        assert!(close(c.y, 0.0, 1e-9));
    }

    #[test]
    fn test_antimeridian_and_pole_clamp() {
        let edge = lon_lat_to_web_mercator(Coord { x: 180.0, y: 90.0 });
        assert!(close(edge.x, 20_037_508.342_789_244, 1e-6));
        // Clamped latitude gives the same extent as longitude
        assert!(close(edge.y, 20_037_508.342_789_244, 1e-3));
    }

    #[test]
    fn test_lima_latitude() {
        // Known EPSG:3857 value for (-77.0428, -12.0464)
        let c = lon_lat_to_web_mercator(Coord {
            x: -77.0428,
            y: -12.0464,
        });
        assert!(close(c.x, -8_576_365.27, 0.01));
        assert!(close(c.y, -1_350_989.48, 0.01));
    }

    #[test]
    fn test_reprojection_is_idempotent() {
        let once = reproject(vec![square(Crs::Geographic)]);
        let twice = reproject(once.clone());

        assert_eq!(once.len(), 1);
        assert_eq!(twice[0].crs, Crs::WebMercator);
        assert_eq!(once[0].boundary, twice[0].boundary);
    }

    #[test]
    fn test_projected_input_unchanged() {
        let input = square(Crs::WebMercator);
        let output = input.clone().to_web_mercator();
        assert_eq!(input.boundary, output.boundary);
    }

    #[test]
    fn test_reproject_preserves_order() {
        let mut a = square(Crs::Geographic);
        a.id = "a".to_string();
        let mut b = square(Crs::WebMercator);
        b.id = "b".to_string();

        let ids: Vec<String> = reproject(vec![a, b]).into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
