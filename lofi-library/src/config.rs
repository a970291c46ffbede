//! Simple configuration persistence for LOFI
//!
//! Stores defaults for the remix pipeline: where stems are written, the
//! target tempo and which separator program to run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default directory separated stems are written under
pub const DEFAULT_OUTPUT_DIR: &str = "output";
/// Default tempo the remix is slowed towards
pub const DEFAULT_TARGET_BPM: u32 = 80;
/// Default separation executable
pub const DEFAULT_SEPARATOR_PROGRAM: &str = "spleeter";
/// Two-stem model: vocals + accompaniment
pub const DEFAULT_SEPARATOR_MODEL: &str = "spleeter:2stems";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory separated stems are written under
    pub output_dir: PathBuf,
    /// Tempo used when no explicit slow factor is given
    pub target_bpm: u32,
    /// Executable used for vocal separation
    pub separator_program: String,
    /// Model passed to the separator
    pub separator_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            target_bpm: DEFAULT_TARGET_BPM,
            separator_program: DEFAULT_SEPARATOR_PROGRAM.to_string(),
            separator_model: DEFAULT_SEPARATOR_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lofi")
            .join("config.txt")
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "output_dir" => config.output_dir = PathBuf::from(value),
                "target_bpm" => {
                    if let Ok(bpm) = value.parse::<u32>() {
                        if bpm > 0 {
                            config.target_bpm = bpm;
                        }
                    }
                }
                "separator_program" => config.separator_program = value.to_string(),
                "separator_model" => config.separator_model = value.to_string(),
                _ => {} // Ignore unknown keys
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse(""), Config::default());
    }

    #[test]
    fn test_parse_values() {
        let content = "output_dir=/tmp/stems\ntarget_bpm=72\nseparator_program=/opt/spleeter";
        let config = Config::parse(content);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/stems"));
        assert_eq!(config.target_bpm, 72);
        assert_eq!(config.separator_program, "/opt/spleeter");
        assert_eq!(config.separator_model, DEFAULT_SEPARATOR_MODEL);
    }

    #[test]
    fn test_parse_ignores_bad_values() {
        let content = "# Comment\ntarget_bpm=fast\nnonsense\ncolour=blue\ntarget_bpm=0";
        let config = Config::parse(content);
        assert_eq!(config.target_bpm, DEFAULT_TARGET_BPM);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(&path, "# LOFI Configuration\ntarget_bpm=70\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config,
            Config {
                target_bpm: 70,
                ..Config::default()
            }
        );
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("config.txt")).is_err());
    }
}
