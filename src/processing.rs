use crate::types::{DistrictGeometry, DistrictRecord, JoinedDistrict, MarkerColor};
use geo::Centroid;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Exponent of the marker size power law.
pub const SIZE_EXPONENT: f64 = 0.48;

/// Divisor keeping the largest markers readable.
pub const SCALE_FACTOR: f64 = 10.0;

/// Left join of records onto geometries by identifier, followed by the
/// visual encoding of each district.
///
/// Output order and length follow `geometries`. A geometry without a
/// matching record keeps a change of 0.
pub fn join_districts(
    geometries: Vec<DistrictGeometry>,
    records: Vec<DistrictRecord>,
) -> Vec<JoinedDistrict> {
    info!(
        "Joining {} records onto {} geometries...",
        records.len(),
        geometries.len()
    );

    let mut by_id: HashMap<String, DistrictRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if by_id.contains_key(&record.id) {
            warn!("Duplicate record for identifier {}, keeping the first", record.id);
            continue;
        }
        by_id.insert(record.id.clone(), record);
    }

    let mut unmatched = 0;
    let joined: Vec<JoinedDistrict> = geometries
        .into_iter()
        .map(|geometry| {
            let record = by_id.get(geometry.id.as_str()).cloned();
            if record.is_none() {
                debug!("No record for district {}", geometry.id);
                unmatched += 1;
            }
            encode_district(geometry, record)
        })
        .collect();

    info!(
        "Joined {} districts ({} without census data)",
        joined.len(),
        unmatched
    );

    joined
}

fn encode_district(geometry: DistrictGeometry, record: Option<DistrictRecord>) -> JoinedDistrict {
    let change = record.as_ref().and_then(|r| r.change).unwrap_or(0.0);

    JoinedDistrict {
        centroid: geometry.boundary.centroid(),
        marker_size: marker_size(change),
        color: marker_color(change),
        change,
        geometry,
        record,
    }
}

/// `|change|^0.48 / 10`; zero change gives a zero-sized marker.
pub fn marker_size(change: f64) -> f64 {
    change.abs().powf(SIZE_EXPONENT) / SCALE_FACTOR
}

/// Zero change shares the negative color with population loss.
pub fn marker_color(change: f64) -> MarkerColor {
    if change > 0.0 {
        MarkerColor::Positive
    } else {
        MarkerColor::Negative
    }
}
