//! Configuration management for webpbatch

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, WebpBatchError};

pub mod profiles;
pub use profiles::*;

/// Name of the profile used when none is given on the command line
pub const DEFAULT_PROFILE: &str = "thumbnail";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conversion profiles by name
    pub profiles: HashMap<String, ConversionProfile>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles: Profiles::all(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Emit log records as JSON
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Encoder parameters for one conversion variant.
///
/// Both variants target `libwebp`; they differ in whether the image is
/// downscaled and lossy or kept at full size and lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CodecParams {
    /// Downscale by an integer divisor and encode lossy
    #[serde(rename = "scaled_lossy")]
    ScaledLossy { scale_divisor: u32, quality: u8 },

    /// Full-size lossless encode
    #[serde(rename = "lossless")]
    Lossless { compression_level: u8 },
}

impl CodecParams {
    /// Highest libwebp compression effort
    pub const MAX_COMPRESSION_LEVEL: u8 = 6;

    /// Encoder codec identifier passed to `-c:v`
    pub fn codec_id(self) -> &'static str {
        "libwebp"
    }

    /// Extension of files produced with these parameters
    pub fn extension(self) -> &'static str {
        "webp"
    }

    /// Short human-readable description
    pub fn describe(self) -> String {
        match self {
            Self::ScaledLossy { scale_divisor, quality } => {
                format!("lossy WebP at 1/{} size, quality {}", scale_divisor, quality)
            }
            Self::Lossless { compression_level } => {
                format!("lossless WebP, compression level {}", compression_level)
            }
        }
    }

    /// Validate parameter ranges
    pub fn validate(self) -> Result<()> {
        match self {
            Self::ScaledLossy { scale_divisor, quality } => {
                if scale_divisor == 0 {
                    return Err(WebpBatchError::invalid_parameters(
                        "Scale divisor must be at least 1",
                    ));
                }
                if quality > 100 {
                    return Err(WebpBatchError::invalid_parameters(format!(
                        "Quality must be between 0-100, got {}",
                        quality
                    )));
                }
            }
            Self::Lossless { compression_level } => {
                if compression_level > Self::MAX_COMPRESSION_LEVEL {
                    return Err(WebpBatchError::invalid_parameters(format!(
                        "Compression level must be between 0-{}, got {}",
                        Self::MAX_COMPRESSION_LEVEL,
                        compression_level
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from file.
    ///
    /// Profiles in the file are added to the built-in ones by name. A profile
    /// that reuses a built-in name replaces it whole, so it must spell out
    /// every required field.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            WebpBatchError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let parsed: Config = match extension_of(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => {
                return Err(WebpBatchError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        Ok(Config::default().merge(parsed))
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match extension_of(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self).map_err(|e| {
                WebpBatchError::config(format!("TOML serialization failed: {}", e))
            })?,
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            _ => {
                return Err(WebpBatchError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            WebpBatchError::config(format!(
                "Failed to write config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get a conversion profile by name
    pub fn get_profile(&self, name: &str) -> Result<&ConversionProfile> {
        self.profiles.get(name).ok_or_else(|| {
            let mut available: Vec<_> = self.profiles.keys().cloned().collect();
            available.sort();
            WebpBatchError::config(format!(
                "Profile '{}' not found. Available profiles: {}",
                name,
                available.join(", ")
            ))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(WebpBatchError::config("No profiles defined"));
        }

        for (name, profile) in &self.profiles {
            profile.validate().map_err(|e| {
                WebpBatchError::config(format!("Invalid profile '{}': {}", name, e))
            })?;
        }

        if self.logging.level.trim().is_empty() {
            return Err(WebpBatchError::config("Log level must not be empty"));
        }

        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Config) -> Self {
        self.profiles.extend(other.profiles);
        self.logging = other.logging;
        self
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.profiles.contains_key("thumbnail"));
        assert!(config.profiles.contains_key("archive"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.profiles.len(), parsed.profiles.len());
        assert_eq!(
            parsed.profiles["thumbnail"].codec,
            CodecParams::ScaledLossy { scale_divisor: 3, quality: 80 }
        );

        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(config.profiles.len(), parsed.profiles.len());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();

        let toml_path = dir.path().join("webpbatch.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert!(loaded.validate().is_ok());

        let yaml_path = dir.path().join("webpbatch.yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert!(loaded.validate().is_ok());

        assert!(config.to_file(dir.path().join("webpbatch.ini")).is_err());
    }

    #[test]
    fn test_partial_file_layers_over_builtins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            r#"
[profiles.hero]
source_dir = "raw/hero"
dest_dir = "public/images/hero"
pattern = "*.jpg"
workers = 4

[profiles.hero.codec]
type = "scaled_lossy"
scale_divisor = 2
quality = 90
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.profiles.contains_key("thumbnail"));
        let hero = config.get_profile("hero").unwrap();
        assert_eq!(hero.workers, 4);
        assert!(!hero.skip_existing);
        assert_eq!(hero.encoder, "ffmpeg");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_same_name_replaces_whole_profile() {
        let dir = TempDir::new().unwrap();

        let fragment = dir.path().join("fragment.toml");
        std::fs::write(&fragment, "[profiles.thumbnail]\nworkers = 8\n").unwrap();
        assert!(Config::from_file(&fragment).is_err());

        let full = dir.path().join("full.toml");
        std::fs::write(
            &full,
            r#"
[profiles.thumbnail]
source_dir = "boards"
dest_dir = "boards_small"
pattern = "*.webp"
workers = 8

[profiles.thumbnail.codec]
type = "scaled_lossy"
scale_divisor = 4
quality = 70
"#,
        )
        .unwrap();

        let config = Config::from_file(&full).unwrap();
        let thumbnail = config.get_profile("thumbnail").unwrap();
        assert_eq!(thumbnail.workers, 8);
        assert_eq!(thumbnail.source_dir, PathBuf::from("boards"));
        assert_eq!(thumbnail.codec, CodecParams::ScaledLossy { scale_divisor: 4, quality: 70 });
        assert!(thumbnail.description.is_none());
        assert!(config.profiles.contains_key("archive"));
    }

    #[test]
    fn test_codec_validation() {
        assert!(CodecParams::ScaledLossy { scale_divisor: 3, quality: 80 }.validate().is_ok());
        assert!(CodecParams::ScaledLossy { scale_divisor: 0, quality: 80 }.validate().is_err());
        assert!(CodecParams::ScaledLossy { scale_divisor: 2, quality: 101 }.validate().is_err());
        assert!(CodecParams::Lossless { compression_level: 6 }.validate().is_ok());
        assert!(CodecParams::Lossless { compression_level: 7 }.validate().is_err());
    }

    #[test]
    fn test_profile_lookup() {
        let config = Config::default();
        assert!(config.get_profile(DEFAULT_PROFILE).is_ok());
        let err = config.get_profile("nonexistent").unwrap_err();
        assert!(err.to_string().contains("archive, thumbnail"));
    }
}
