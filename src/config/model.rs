use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use anyhow::Result;
use crate::external_sort::SorterConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw `id,name,price` source read by the sorter.
    pub source_file: PathBuf,
    /// Where the derivative files and the manifest live.
    pub data_directory: PathBuf,
    pub sorter: SorterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `silent`, `normal`, `verbose`.
    pub verbosity: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_file: PathBuf::from("data/products.csv"),
            data_directory: PathBuf::from("data/sorted"),
            sorter: SorterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { verbosity: "normal".to_string() }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.sorter.validate()?;
        if self.source_file.as_os_str().is_empty() {
            anyhow::bail!("source_file must not be empty");
        }
        if self.data_directory.as_os_str().is_empty() {
            anyhow::bail!("data_directory must not be empty");
        }
        match self.logging.verbosity.as_str() {
            "silent" | "normal" | "verbose" => Ok(()),
            other => anyhow::bail!("Unknown logging verbosity: {}", other),
        }
    }
}
