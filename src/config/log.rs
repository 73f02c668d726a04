use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_name: default_file_name(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() || self.file_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::InvalidConfig(format!(
                "log.file_name '{}' must be a plain file name",
                self.file_name
            )));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_file_name() -> String {
    "broker.log".to_string()
}
