//! Service configuration.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mailcatch_core::SmtpSettings;
use mailcatch_ipc::{CLIENT_PORT, SERVER_PORT};

/// Service configuration, read from `mailcatch/config.json` under the
/// platform config directory. A missing file or missing fields fall back
/// to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SMTP listener settings.
    pub smtp: SmtpSettings,
    /// Whether the SMTP listener starts enabled.
    pub smtp_enabled: bool,
    /// Port this service accepts exchanges on.
    pub ipc_port: u16,
    /// Port the UI process accepts exchanges on.
    pub ui_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp: SmtpSettings::default(),
            smtp_enabled: true,
            ipc_port: SERVER_PORT,
            ui_port: CLIENT_PORT,
        }
    }
}

impl Config {
    /// Loads the configuration file, falling back to defaults when absent.
    pub fn load() -> anyhow::Result<Self> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailcatch").join("config.json"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_protocol_ports() {
        let config = Config::default();
        assert_eq!(config.ipc_port, SERVER_PORT);
        assert_eq!(config.ui_port, CLIENT_PORT);
        assert!(config.smtp_enabled);
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"smtp_enabled":false}"#).unwrap();
        assert!(!config.smtp_enabled);
        assert_eq!(config.smtp, SmtpSettings::default());
        assert_eq!(config.ipc_port, SERVER_PORT);
    }
}
