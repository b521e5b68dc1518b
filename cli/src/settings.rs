use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_FILE: &str = "htmlflow.toml";

/// Rendering settings from `htmlflow.toml`. Command-line flags win.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Replaces the document's header before `<html>`.
    pub header: Option<String>,
    pub thread_safe: bool,
    /// Write through stdout instead of buffering each render.
    pub stream: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Settings {
    /// Reads `explicit`, or [`DEFAULT_FILE`] if it exists, or falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_FILE);
                if !path.is_file() {
                    return Ok(Settings::default());
                }
                path
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        let settings = toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(target: "htmlflow.cli", path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    pub fn with_flags(mut self, header: Option<String>, thread_safe: bool, stream: bool) -> Self {
        if header.is_some() {
            self.header = header;
        }
        self.thread_safe |= thread_safe;
        self.stream |= stream;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn explicit_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "header = \"<!doctype html>\"\nthread_safe = true").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(
            settings,
            Settings {
                header: Some("<!doctype html>".into()),
                thread_safe: true,
                stream: false,
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threads = 4").unwrap();
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(SettingsError::Io { .. })
        ));
    }

    #[test]
    fn flags_override_file_values() {
        let file = Settings {
            header: Some("<!-- file -->".into()),
            thread_safe: false,
            stream: true,
        };
        let merged = file.with_flags(Some("<!-- flag -->".into()), true, false);
        assert_eq!(merged.header.as_deref(), Some("<!-- flag -->"));
        assert!(merged.thread_safe);
        assert!(merged.stream);
    }
}
