use crate::{LevelFilter, Logger, LoggerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Console line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logger options as they appear in a settings file.
///
/// ```toml
/// [log]
/// level = "debug"
/// filter = "shroud=trace"
/// path = "/var/log/shroud"
/// json = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub name: String,
    pub level: String,
    pub filter: Option<String>,
    pub console: bool,
    pub format: LogFormat,
    pub path: Option<PathBuf>,
    /// JSON lines for file output.
    pub json: bool,
    pub max_files: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            name: "shroud".to_owned(),
            level: "info".to_owned(),
            filter: None,
            console: true,
            format: LogFormat::Compact,
            path: None,
            json: false,
            max_files: 10,
        }
    }
}

impl LogSettings {
    /// Parses [`LogSettings::level`].
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for an unknown level name.
    pub fn level_filter(&self) -> Result<LevelFilter, LoggerError> {
        self.level.parse().map_err(|_| LoggerError::InvalidConfiguration {
            message: format!("Unknown log level '{}'", self.level).into(),
            context: Some("log.level".into()),
        })
    }

    /// Initializes the global subscriber from these settings.
    ///
    /// # Errors
    /// See [`crate::LoggerBuilder::init`].
    pub fn init(&self) -> Result<Logger, LoggerError> {
        let mut builder = Logger::builder()
            .name(&self.name)
            .console(self.console)
            .format(self.format)
            .level(self.level_filter()?);
        if let Some(filter) = &self.filter {
            builder = builder.env_filter(filter);
        }

        match &self.path {
            Some(path) => {
                let builder = builder.path(path).max_files(self.max_files);
                if self.json { builder.json().init() } else { builder.init() }
            },
            None => builder.init(),
        }
    }
}
