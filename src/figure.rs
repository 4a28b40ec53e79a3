//! The static map figure: district outlines, centroid markers, a fixed
//! legend and a data-locked view range.

use crate::processing::{marker_color, marker_size};
use crate::types::{JoinedDistrict, MarkerColor};
use geo::{BoundingRect, Coord, Point, Rect};
use tracing::info;

pub const TITLE: &str = "District-Level Population Change in Peru (2007-2022)";
pub const CAPTION: &str =
    "Source: INEI, Census Data (2007) and Population Projections (2018-2022)";
pub const LEGEND_TITLE: &str = "- Population change -";

/// Caption anchor in paper coordinates (fractions of the plot area,
/// y measured upwards from its bottom edge).
pub const CAPTION_ANCHOR: (f64, f64) = (0.01, -0.05);

const LEGEND_VALUES: [(&str, f64); 6] = [
    ("+50,000", 50_000.0),
    ("+25,000", 25_000.0),
    ("+10,000", 10_000.0),
    ("-1,000", -1_000.0),
    ("-10,000", -10_000.0),
    ("-25,000", -25_000.0),
];

/// Axis-aligned extent in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl From<Rect<f64>> for Extent {
    fn from(rect: Rect<f64>) -> Self {
        Extent::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Closed outer ring of one polygon part.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub points: Vec<Coord<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Point<f64>,
    // Diameter in pixels
    pub size: f64,
    pub color: MarkerColor,
    pub hover: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: &'static str,
    pub size: f64,
    pub color: MarkerColor,
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub title: &'static str,
    pub caption: &'static str,
    pub caption_anchor: (f64, f64),
    pub outlines: Vec<Outline>,
    pub markers: Vec<Marker>,
    pub legend_title: &'static str,
    pub legend: Vec<LegendEntry>,
    pub range: Extent,
    pub aspect_ratio: f64,
    pub show_axes: bool,
}

/// Build the figure from encoded districts. Purely presentational.
pub fn build_figure(districts: &[JoinedDistrict]) -> Figure {
    let outlines: Vec<Outline> = districts
        .iter()
        .flat_map(|d| d.geometry.boundary.iter())
        .map(|part| Outline {
            points: part.exterior().0.clone(),
        })
        .collect();

    let markers: Vec<Marker> = districts
        .iter()
        .filter_map(|d| {
            d.centroid.map(|position| Marker {
                position,
                size: d.marker_size,
                color: d.color,
                hover: format!("{}: {}", d.display_name(), format_change(d.change)),
            })
        })
        .collect();

    let range = districts
        .iter()
        .filter_map(|d| d.geometry.boundary.bounding_rect())
        .map(Extent::from)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    info!(
        "Built figure with {} outlines and {} markers",
        outlines.len(),
        markers.len()
    );

    Figure {
        title: TITLE,
        caption: CAPTION,
        caption_anchor: CAPTION_ANCHOR,
        outlines,
        markers,
        legend_title: LEGEND_TITLE,
        legend: legend_entries(),
        range,
        aspect_ratio: 1.0,
        show_axes: false,
    }
}

/// Fixed example values run through the marker encoding, independent of
/// the data range.
pub fn legend_entries() -> Vec<LegendEntry> {
    LEGEND_VALUES
        .iter()
        .map(|&(label, value)| LegendEntry {
            label,
            size: marker_size(value),
            color: marker_color(value),
        })
        .collect()
}

/// Raw metric as shown on hover: integers without a fractional part.
pub fn format_change(change: f64) -> String {
    if change.fract() == 0.0 && change.abs() < 1e15 {
        format!("{}", change as i64)
    } else {
        change.to_string()
    }
}
