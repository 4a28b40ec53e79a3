use crate::types::Crs;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub figure: FigureConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub table: PathBuf,
    pub sheet: Option<String>, // First worksheet when unset
    #[serde(default = "default_table_id_column")]
    pub table_id_column: String,
    #[serde(default = "default_table_name_column")]
    pub table_name_column: String,
    #[serde(default = "default_table_value_column")]
    pub table_value_column: String,
    pub geometry: PathBuf,
    #[serde(default = "default_geometry_id_column")]
    pub geometry_id_column: String,
    pub geometry_name_column: Option<String>,
    pub source_crs: Option<String>,
}

impl InputConfig {
    /// Minimal input section with the column names of the INEI district table.
    pub fn new(table: impl Into<PathBuf>, geometry: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            sheet: None,
            table_id_column: default_table_id_column(),
            table_name_column: default_table_name_column(),
            table_value_column: default_table_value_column(),
            geometry: geometry.into(),
            geometry_id_column: default_geometry_id_column(),
            geometry_name_column: None,
            source_crs: None,
        }
    }

    /// Explicit frame override for the geometry source, if configured.
    pub fn source_crs(&self) -> Result<Option<Crs>> {
        self.source_crs
            .as_deref()
            .map(|code| Crs::from_code(code).ok_or_else(|| anyhow!("Unknown source_crs: {}", code)))
            .transpose()
    }
}

fn default_table_id_column() -> String {
    "ubigeo".to_string()
}

fn default_table_name_column() -> String {
    "distrito".to_string()
}

fn default_table_value_column() -> String {
    "cp_dif".to_string()
}

fn default_geometry_id_column() -> String {
    "UBIGEO".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FigureConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub svg: PathBuf,
    pub html: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg: PathBuf::from("output/population_change.svg"),
            html: PathBuf::from("output/index.html"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8050 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.input.source_crs()?;
        Ok(config)
    }
}
