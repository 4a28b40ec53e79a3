use crate::config::InputConfig;
use crate::error::LoadError;
use crate::types::{Crs, DistrictGeometry, DistrictRecord};
use calamine::{open_workbook_auto, Data, Reader as _};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape, ShapeReader};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the census table and the district boundaries named by `input`.
///
/// Both sources are read completely and closed before this returns.
pub fn load_data(
    input: &InputConfig,
    crs_override: Option<Crs>,
) -> Result<(Vec<DistrictRecord>, Vec<DistrictGeometry>), LoadError> {
    info!("Loading data...");

    let records = load_records(input)?;
    info!("Loaded {} district records from {:?}", records.len(), input.table);

    let geometries = load_geometries(input, crs_override)?;
    info!(
        "Loaded {} district geometries from {:?}",
        geometries.len(),
        input.geometry
    );

    Ok((records, geometries))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

pub fn load_records(input: &InputConfig) -> Result<Vec<DistrictRecord>, LoadError> {
    let extension = extension_of(&input.table);
    match extension.as_str() {
        "csv" => load_csv_records(input),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet_records(input),
        _ => Err(LoadError::UnsupportedFormat {
            path: input.table.clone(),
            extension,
        }),
    }
}

/// Positions of the three required table columns.
struct TableColumns {
    id: usize,
    name: usize,
    value: usize,
}

impl TableColumns {
    fn locate(input: &InputConfig, headers: &[String]) -> Result<Self, LoadError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| LoadError::missing_column(&input.table, column))
        };
        Ok(Self {
            id: find(&input.table_id_column)?,
            name: find(&input.table_name_column)?,
            value: find(&input.table_value_column)?,
        })
    }
}

fn load_csv_records(input: &InputConfig) -> Result<Vec<DistrictRecord>, LoadError> {
    let path = &input.table;
    let csv_error = |source| LoadError::Csv {
        path: path.clone(),
        source,
    };

    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let headers: Vec<String> = headers.iter().map(str::to_string).collect();
    let columns = TableColumns::locate(input, &headers)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(csv_error)?;
        let id = row.get(columns.id).unwrap_or("").trim().to_string();

        if id.is_empty() {
            continue;
        }

        records.push(DistrictRecord {
            id,
            name: row.get(columns.name).unwrap_or("").trim().to_string(),
            change: row.get(columns.value).and_then(parse_number),
        });
    }

    Ok(records)
}

static EMPTY_CELL: Data = Data::Empty;

fn load_spreadsheet_records(input: &InputConfig) -> Result<Vec<DistrictRecord>, LoadError> {
    let path = &input.table;
    let spreadsheet_error = |source| LoadError::Spreadsheet {
        path: path.clone(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
    let range = match &input.sheet {
        Some(sheet) => {
            if !workbook.sheet_names().iter().any(|name| name == sheet) {
                return Err(LoadError::MissingSheet {
                    path: path.clone(),
                    sheet: sheet.clone(),
                });
            }
            workbook.worksheet_range(sheet).map_err(spreadsheet_error)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::MissingSheet {
                path: path.clone(),
                sheet: "#0".to_string(),
            })?
            .map_err(spreadsheet_error)?,
    };

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| LoadError::missing_column(path, &input.table_id_column))?;
    let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let columns = TableColumns::locate(input, &headers)?;

    let mut records = Vec::new();
    for row in rows {
        let cell = |i: usize| row.get(i).unwrap_or(&EMPTY_CELL);

        let id = cell_to_identifier(cell(columns.id));
        if id.is_empty() {
            continue;
        }

        records.push(DistrictRecord {
            id,
            name: cell(columns.name).to_string().trim().to_string(),
            change: cell_to_number(cell(columns.value)),
        });
    }

    Ok(records)
}

/// String form of an identifier cell. Integral numbers lose their `.0`
/// so that `10101.0` and `"10101"` compare equal. Any other cell keeps its
/// displayed text, as a CSV export would.
pub fn cell_to_identifier(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => number_to_identifier(*f),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_to_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn number_to_identifier(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn load_geometries(
    input: &InputConfig,
    crs_override: Option<Crs>,
) -> Result<Vec<DistrictGeometry>, LoadError> {
    let extension = extension_of(&input.geometry);
    let geometries = match extension.as_str() {
        "shp" => load_shapefile(input, crs_override)?,
        "json" | "geojson" => load_geojson(input, crs_override)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: input.geometry.clone(),
                extension,
            })
        }
    };

    if geometries.is_empty() {
        return Err(LoadError::NoGeometries(input.geometry.clone()));
    }

    Ok(geometries)
}

/// Frame of a shapefile, taken from its `.prj` sidecar.
fn shapefile_crs(path: &Path) -> Result<Crs, LoadError> {
    let prj = path.with_extension("prj");
    if !prj.exists() {
        warn!("No .prj next to {:?}, assuming {}", path, Crs::Geographic);
        return Ok(Crs::Geographic);
    }

    let wkt = fs::read_to_string(&prj).map_err(|e| LoadError::io(&prj, e))?;
    Crs::from_prj_wkt(&wkt).ok_or_else(|| LoadError::UnsupportedCrs {
        path: prj.clone(),
        detail: wkt.chars().take(80).collect(),
    })
}

fn load_shapefile(
    input: &InputConfig,
    crs_override: Option<Crs>,
) -> Result<Vec<DistrictGeometry>, LoadError> {
    let path = &input.geometry;
    let crs = match crs_override {
        Some(crs) => crs,
        None => shapefile_crs(path)?,
    };
    let shapefile_error = |source| LoadError::Shapefile {
        path: path.clone(),
        source,
    };

    // District names in the INEI attribute tables are Latin-1
    let shape_reader = ShapeReader::from_path(path).map_err(shapefile_error)?;
    let dbf_path = path.with_extension("dbf");
    let dbf_reader =
        shapefile::dbase::Reader::from_path_with_encoding(&dbf_path, yore::code_pages::CP1252)
            .map_err(|source| LoadError::Attributes {
                path: dbf_path.clone(),
                source,
            })?;
    let mut reader = Reader::new(shape_reader, dbf_reader);

    let mut geometries = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(shapefile_error)?;

        let id_value = record
            .get(&input.geometry_id_column)
            .ok_or_else(|| LoadError::missing_column(path, &input.geometry_id_column))?;
        let id = field_to_string(id_value).unwrap_or_default();

        let name = match &input.geometry_name_column {
            Some(column) => Some(
                record
                    .get(column)
                    .ok_or_else(|| LoadError::missing_column(path, column))
                    .map(|v| field_to_string(v).unwrap_or_default())?,
            ),
            None => None,
        };

        let unsupported = |detail: String| LoadError::UnsupportedShape {
            path: path.clone(),
            index,
            detail,
        };

        let boundary: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(format!("{:?}", e)))?,
            Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(format!("{:?}", e)))?,
            Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(format!("{:?}", e)))?,
            Shape::NullShape => {
                debug!("District {} has a null shape", id);
                MultiPolygon::new(vec![])
            }
            other => return Err(unsupported(format!("{:?}", other.shapetype()))),
        };

        geometries.push(DistrictGeometry {
            id,
            name,
            boundary,
            crs,
        });
    }

    Ok(geometries)
}

/// Attribute value as text. Numeric identifiers are coerced like
/// spreadsheet cells.
fn field_to_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(n) => n.map(number_to_identifier),
        FieldValue::Float(n) => n.map(|f| number_to_identifier(f as f64)),
        FieldValue::Double(n) => Some(number_to_identifier(*n)),
        FieldValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn load_geojson(
    input: &InputConfig,
    crs_override: Option<Crs>,
) -> Result<Vec<DistrictGeometry>, LoadError> {
    use geojson::GeoJson;

    let path = &input.geometry;
    let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;

    let geojson = content.parse::<GeoJson>().map_err(|source| LoadError::GeoJson {
        path: path.clone(),
        source,
    })?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(LoadError::UnsupportedShape {
                path: path.clone(),
                index: 0,
                detail: "GeoJSON must be a FeatureCollection".to_string(),
            })
        }
    };

    // RFC 7946 coordinates are always longitude/latitude
    let crs = crs_override.unwrap_or(Crs::Geographic);
    let mut geometries = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let property = |column: &str| {
            feature
                .properties
                .as_ref()
                .and_then(|props| props.get(column))
                .map(json_to_string)
        };

        let id = property(&input.geometry_id_column)
            .ok_or_else(|| LoadError::missing_column(path, &input.geometry_id_column))?;
        let name = match &input.geometry_name_column {
            Some(column) => Some(
                property(column).ok_or_else(|| LoadError::missing_column(path, column))?,
            ),
            None => None,
        };

        let unsupported = |detail: String| LoadError::UnsupportedShape {
            path: path.clone(),
            index,
            detail,
        };

        let boundary = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e: geojson::Error| unsupported(e.to_string()))?;

                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    other => return Err(unsupported(format!("{:?}", other).chars().take(40).collect())),
                }
            }
            None => MultiPolygon::new(vec![]),
        };

        geometries.push(DistrictGeometry {
            id,
            name,
            boundary,
            crs,
        });
    }

    Ok(geometries)
}

fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => number_to_identifier(f),
            _ => n.to_string(),
        },
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
