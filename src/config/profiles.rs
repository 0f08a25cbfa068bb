//! Conversion profiles for the gallery asset variants

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::config::CodecParams;
use crate::error::{Result, WebpBatchError};

/// Upper bound on concurrent encoder processes per profile
pub const MAX_WORKERS: usize = 1024;

/// Every option the batch driver recognises, grouped under a name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProfile {
    /// One-line description shown by `webpbatch profiles`
    #[serde(default)]
    pub description: Option<String>,

    /// Directory scanned (non-recursively) for inputs
    pub source_dir: PathBuf,

    /// Directory receiving converted files
    pub dest_dir: PathBuf,

    /// Wildcard matched against input file names
    pub pattern: String,

    /// Maximum concurrent encoder processes
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Encoder parameters
    pub codec: CodecParams,

    /// Leave inputs alone whose output already exists
    #[serde(default)]
    pub skip_existing: bool,

    /// Encoder program name or path
    #[serde(default = "default_encoder")]
    pub encoder: String,
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_encoder() -> String {
    "ffmpeg".to_string()
}

impl ConversionProfile {
    /// Create a profile with default workers, encoder and no skip check
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>, P: Into<String>>(
        source_dir: S,
        dest_dir: D,
        pattern: P,
        codec: CodecParams,
    ) -> Self {
        Self {
            description: None,
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            pattern: pattern.into(),
            workers: default_workers(),
            codec,
            skip_existing: false,
            encoder: default_encoder(),
        }
    }

    /// Set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable skip-on-exists
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Set the encoder program
    pub fn encoder<S: Into<String>>(mut self, encoder: S) -> Self {
        self.encoder = encoder.into();
        self
    }

    /// Set the description
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the profile configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(WebpBatchError::invalid_parameters(
                "Worker count must be greater than 0",
            ));
        }

        if self.workers > MAX_WORKERS {
            return Err(WebpBatchError::invalid_parameters(format!(
                "Worker count must be at most {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }

        if self.pattern.trim().is_empty() {
            return Err(WebpBatchError::invalid_parameters(
                "File pattern must not be empty",
            ));
        }

        if self.pattern.contains(['/', '\\']) {
            return Err(WebpBatchError::invalid_parameters(
                "File pattern matches names only and must not contain path separators",
            ));
        }

        if self.encoder.trim().is_empty() {
            return Err(WebpBatchError::invalid_parameters(
                "Encoder program must not be empty",
            ));
        }

        if self.source_dir == self.dest_dir {
            return Err(WebpBatchError::invalid_parameters(format!(
                "Source and destination must differ, both are {:?}",
                self.source_dir
            )));
        }

        self.codec.validate()
    }
}

/// Built-in profiles for the whiteboard gallery
pub struct Profiles;

impl Profiles {
    /// Gallery thumbnails: one third of the original size, lossy WebP.
    /// Outputs are always regenerated.
    pub fn thumbnail() -> ConversionProfile {
        ConversionProfile::new(
            "public/images/whiteboards",
            "public/images/whiteboards_small",
            "*.webp",
            CodecParams::ScaledLossy { scale_divisor: 3, quality: 80 },
        )
        .workers(40)
        .description("Gallery thumbnails (1/3 size, quality 80)")
    }

    /// Full-size lossless WebP from PNG originals.
    /// Outputs that already exist are kept.
    pub fn archive() -> ConversionProfile {
        ConversionProfile::new(
            "raw/whiteboards",
            "public/images/whiteboards",
            "*.png",
            CodecParams::Lossless { compression_level: CodecParams::MAX_COMPRESSION_LEVEL },
        )
        .skip_existing(true)
        .description("Lossless full-size WebP from PNG originals")
    }

    /// Get all predefined profiles
    pub fn all() -> std::collections::HashMap<String, ConversionProfile> {
        let mut profiles = std::collections::HashMap::new();
        profiles.insert("thumbnail".to_string(), Self::thumbnail());
        profiles.insert("archive".to_string(), Self::archive());
        profiles
    }
}
