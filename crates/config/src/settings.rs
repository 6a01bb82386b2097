// Application settings
// Loaded from ~/.config/labelgen/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// How product files are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Excel sheet to read; first sheet when unset
    pub sheet: Option<String>,
    /// CSV separator (`,` `;` `|` or `tab`); sniffed when unset
    pub separator: Option<String>,
    /// CSV encoding label; UTF-8 with Windows-1252 fallback when unset
    pub encoding: Option<String>,
    /// Column shared by the product and EAN files
    pub join_key: String,
    /// Column taken from the EAN file
    pub mapped_field: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            sheet: None,
            separator: None,
            encoding: None,
            join_key: "Code".to_string(),
            mapped_field: "Barcode".to_string(),
        }
    }
}

impl InputSettings {
    /// The separator as a byte, if one is configured.
    pub fn separator_byte(&self) -> Result<Option<u8>, ConfigError> {
        self.separator.as_deref().map(parse_separator).transpose()
    }
}

/// Parse a separator given on the command line or in settings.
pub fn parse_separator(s: &str) -> Result<u8, ConfigError> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(ConfigError::InvalidSeparator(s.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Default `.dymo` template
    pub template: Option<PathBuf>,
    pub filename_pattern: String,
    /// Directory for batch output
    pub out_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            template: None,
            filename_pattern: "{Code}_{Color}_{Size}.dymo".to_string(),
            out_dir: PathBuf::from("out"),
        }
    }
}

/// Interactive session paging and previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Groups listed before `more` is needed
    pub groups_page_size: usize,
    /// Groups added by each `more`
    pub groups_page_step: usize,
    /// Characters of filled label shown by previews
    pub preview_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            groups_page_size: 5,
            groups_page_step: 10,
            preview_chars: 400,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: InputSettings,
    pub output: OutputSettings,
    pub session: SessionSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("labelgen")
            .join("settings.toml")
    }

    /// Load settings from an explicit file. Missing keys take defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        settings.input.separator_byte()?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// `--config` when given (errors are fatal), else the default location.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => Ok(Self::load()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.output.filename_pattern, "{Code}_{Color}_{Size}.dymo");
        assert_eq!(s.session.groups_page_size, 5);
        assert_eq!(s.session.groups_page_step, 10);
        assert_eq!(s.session.preview_chars, 400);
        assert_eq!(s.input.join_key, "Code");
        assert_eq!(s.input.mapped_field, "Barcode");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[input]\nseparator = \";\"\n\n[output]\nfilename_pattern = \"{i}.dymo\"\n",
        )
        .unwrap();

        let s = Settings::load_from(&path).unwrap();
        assert_eq!(s.input.separator_byte().unwrap(), Some(b';'));
        assert_eq!(s.output.filename_pattern, "{i}.dymo");
        assert_eq!(s.output.out_dir, PathBuf::from("out"));
        assert_eq!(s.session, SessionSettings::default());
    }

    #[test]
    fn bad_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Read { .. })));

        fs::write(&path, "[session]\ngroups_page_size = \"five\"\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "[input]\nseparator = \";;\"\n").unwrap();
        assert_eq!(
            Settings::load_from(&path),
            Err(ConfigError::InvalidSeparator(";;".to_string()))
        );
    }

    #[test]
    fn separators() {
        assert_eq!(parse_separator("tab").unwrap(), b'\t');
        assert_eq!(parse_separator("|").unwrap(), b'|');
        assert!(parse_separator("ab").is_err());
        assert!(parse_separator("é").is_err());
    }

    #[test]
    fn toml_round_trip() {
        let text = toml::to_string_pretty(&Settings::default()).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, Settings::default());
    }
}
