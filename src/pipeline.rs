use crate::config::InputConfig;
use crate::data;
use crate::error::LoadError;
use crate::figure::{build_figure, Figure};
use crate::processing::join_districts;
use crate::projection::reproject;
use crate::types::{Crs, DistrictGeometry, DistrictRecord};
use tracing::info;

/// Load, reproject, join, encode and lay out the map. Runs once per
/// process; the returned figure is never mutated afterwards.
pub fn build_map(input: &InputConfig, crs_override: Option<Crs>) -> Result<Figure, LoadError> {
    let (records, geometries) = data::load_data(input, crs_override)?;
    Ok(build_map_from(geometries, records))
}

/// The in-memory part of [`build_map`], for tables and geometries that
/// are already loaded.
pub fn build_map_from(geometries: Vec<DistrictGeometry>, records: Vec<DistrictRecord>) -> Figure {
    let geometries = reproject(geometries);
    let districts = join_districts(geometries, records);
    let figure = build_figure(&districts);

    info!(
        "Map ready: {} districts, extent {:.0} x {:.0} m",
        districts.len(),
        figure.range.width(),
        figure.range.height()
    );

    figure
}
