//! Load failures. All of them are fatal: the map is either fully built or
//! the process does not start.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read spreadsheet {path:?}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet {path:?} has no worksheet {sheet:?}")]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("failed to read shapefile {path:?}")]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("failed to read attribute table of {path:?}")]
    Attributes {
        path: PathBuf,
        #[source]
        source: dbase::Error,
    },

    #[error("failed to parse GeoJSON {path:?}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },

    #[error("column '{column}' not found in {path:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("unsupported input format '{extension}' for {path:?}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("unsupported coordinate reference system for {path:?}: {detail}")]
    UnsupportedCrs { path: PathBuf, detail: String },

    #[error("feature {index} of {path:?} is not a polygon ({detail})")]
    UnsupportedShape {
        path: PathBuf,
        index: usize,
        detail: String,
    },

    #[error("no district geometries found in {0:?}")]
    NoGeometries(PathBuf),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }
}
