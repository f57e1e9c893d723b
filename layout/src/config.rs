//! Conversion configuration.
//!
//! YAML-serializable settings for file and batch conversion. Every field has
//! a default, so a config file only needs the keys it changes.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! input_dir: ./copybooks
//! output_dir: ./schemas
//! padding: 6
//! format: json
//! extensions: [cpy, cbl, txt]
//! envelope: false
//! jobs: 4
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::LayoutOptions;
use crate::error::Result;
use crate::output::OutputFormat;

/// Default directory holding the copybook to convert.
pub const DEFAULT_INPUT_DIR: &str = "./input_file";
/// Default directory receiving schema files.
pub const DEFAULT_OUTPUT_DIR: &str = "./output_json";
/// Extensions accepted when scanning directories for copybooks.
pub const DEFAULT_EXTENSIONS: &[&str] = &["cpy", "cbl", "cob", "copy", "txt"];

/// File and batch conversion settings.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::config::ConvertConfig;
///
/// let config: ConvertConfig = serde_yaml::from_str("padding: 6\njobs: 2\n").unwrap();
/// assert_eq!(config.padding, 6);
/// assert_eq!(config.jobs, Some(2));
/// assert_eq!(config.output_dir.to_str(), Some("./output_json"));
/// assert!(config.accepts_extension("CPY"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Leading sequence-area columns to drop from each line.
    pub padding: usize,
    pub format: OutputFormat,
    /// Copybook file extensions (without the dot), compared case-insensitively.
    pub extensions: Vec<String>,
    /// Write the full record schema instead of its `data` array.
    pub envelope: bool,
    /// Parallel batch jobs (`None` = adaptive default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            padding: 0,
            format: OutputFormat::Json,
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            envelope: false,
            jobs: None,
        }
    }
}

impl ConvertConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ConvertError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::ConvertError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ConvertError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::ConvertError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::with_padding(self.padding)
    }

    /// Returns `true` if `extension` is one of the configured copybook
    /// extensions.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Returns `true` if the file at `path` has a configured extension.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.accepts_extension(ext))
    }
}
