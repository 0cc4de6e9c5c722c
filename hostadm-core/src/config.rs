//! Optional `hostadm.yml` configuration.
//!
//! The dashboard works with no config at all; a config file can set the
//! header title and add quick actions to the home menu.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An operator-defined menu entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuickAction {
    /// Menu label.
    pub label: String,
    /// Shell line or embedded script reference.
    pub command: String,
    /// Secondary text shown under the menu.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HostadmConfig {
    /// Header title (defaults to "hostadm").
    #[serde(default)]
    pub title: Option<String>,

    /// Extra entries for the home menu.
    #[serde(default)]
    pub quick_actions: Vec<QuickAction>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("quick action {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

impl HostadmConfig {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("hostadm")
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Look for a config in the usual places. `Ok(None)` means no file
    /// exists; a present-but-broken file is an error the caller should
    /// surface.
    pub fn discover() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let candidates = [PathBuf::from("hostadm.yml"), PathBuf::from("/etc/hostadm.yml")];
        for path in candidates {
            if path.is_file() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (index, action) in self.quick_actions.iter().enumerate() {
            if action.label.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    index,
                    field: "label",
                });
            }
            if action.command.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    index,
                    field: "command",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_gets_defaults() {
        let config = HostadmConfig::parse("{}").unwrap();
        assert_eq!(config.title(), "hostadm");
        assert!(config.quick_actions.is_empty());
    }

    #[test]
    fn parses_quick_actions() {
        let yaml = r#"
title: web-01
quick_actions:
  - label: Reload nginx
    command: systemctl reload nginx
    description: Zero-downtime config reload
  - label: Tail syslog
    command: journalctl -n 200 --no-pager
"#;
        let config = HostadmConfig::parse(yaml).unwrap();
        assert_eq!(config.title(), "web-01");
        assert_eq!(config.quick_actions.len(), 2);
        assert_eq!(config.quick_actions[0].label, "Reload nginx");
        assert!(config.quick_actions[1].description.is_none());
    }

    #[test]
    fn rejects_empty_command() {
        let yaml = r#"
quick_actions:
  - label: Broken
    command: "  "
"#;
        let err = HostadmConfig::parse(yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyField {
                field: "command",
                ..
            }
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title: db-host").unwrap();
        let config = HostadmConfig::load(file.path()).unwrap();
        assert_eq!(config.title(), "db-host");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = HostadmConfig::load(Path::new("/no/such/hostadm.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
