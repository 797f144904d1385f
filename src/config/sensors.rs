//! Loader for the sensor definition file.
//!
//! One directive per line, `#` starts a comment line:
//!
//! ```text
//! OPTION <name> <value>
//! <driver> <device> <location> <name> [unit]
//! ```
//!
//! Short lines are reported and skipped. Lines that are too long or carry too
//! many tokens mean the file is corrupt and abort the load.

use crate::models::OptionEntry;
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_TOKENS: usize = 16;
pub const MAX_LINE: usize = 1024;

const OPTION_KEYWORD: &str = "OPTION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access configuration file {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: too many tokens (limit is {})", MAX_TOKENS)]
    TooManyTokens { line: usize },

    #[error("line {line}: longer than {} bytes", MAX_LINE)]
    LineTooLong { line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorDefinition {
    pub driver: String,
    pub device: String,
    pub location: String,
    pub name: String,
    pub unit: Option<String>,
}

/// Everything declared in a sensor definition file, in file order.
#[derive(Debug, Clone, Default)]
pub struct SensorDefinitions {
    pub sensors: Vec<SensorDefinition>,
    pub options: Vec<OptionEntry>,
}

impl SensorDefinitions {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading sensor definitions from {}", path.display());

        let bytes = fs::read(path).map_err(|source| ConfigError::Access {
            path: path.to_path_buf(),
            source,
        })?;
        // Names are opaque labels: keep files in legacy encodings loadable.
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut definitions = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if raw.len() > MAX_LINE {
                return Err(ConfigError::LineTooLong { line });
            }

            let trimmed = raw.trim_end_matches(char::is_control).trim_matches(' ');
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens = split_tokens(trimmed, line)?;
            if tokens[0] == OPTION_KEYWORD {
                if tokens.len() < 3 {
                    warn!("line {}: invalid option line (too few items)", line);
                    continue;
                }
                definitions.options.push(OptionEntry {
                    name: tokens[1].to_string(),
                    value: tokens[2].to_string(),
                });
                continue;
            }

            if tokens.len() < 4 {
                warn!("line {}: invalid sensor line (too few items)", line);
                continue;
            }
            definitions.sensors.push(SensorDefinition {
                driver: tokens[0].to_string(),
                device: tokens[1].to_string(),
                location: tokens[2].to_string(),
                name: tokens[3].to_string(),
                unit: tokens.get(4).map(|u| u.to_string()),
            });
        }

        debug!(
            "Loaded {} sensors and {} options",
            definitions.sensors.len(),
            definitions.options.len()
        );
        Ok(definitions)
    }
}

// Split on runs of spaces. Never returns an empty list for a non-blank line.
fn split_tokens(line: &str, number: usize) -> Result<Vec<&str>, ConfigError> {
    let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() > MAX_TOKENS {
        return Err(ConfigError::TooManyTokens { line: number });
    }
    Ok(tokens)
}
