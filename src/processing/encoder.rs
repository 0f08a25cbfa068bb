//! External encoder invocation

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

use crate::config::CodecParams;
use crate::error::{Result, WebpBatchError};
use crate::processing::ConversionTask;

/// Raw result of one encoder invocation
#[derive(Debug, Clone)]
pub enum EncodeOutcome {
    /// The process ran to completion
    Finished { success: bool, stderr: Vec<u8> },
    /// The process could not be started
    SpawnFailed(String),
}

/// Something that turns one task into an output file, blocking until done.
///
/// Implementations run on the blocking thread pool, one call per task.
pub trait Encoder: Send + Sync {
    fn encode(&self, task: &ConversionTask) -> EncodeOutcome;
}

/// Encoder backed by the `ffmpeg` command line tool
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the transcoding command for one task
    pub fn command(&self, task: &ConversionTask) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-y").arg("-i").arg(&task.source);

        match task.codec {
            CodecParams::ScaledLossy { scale_divisor, quality } => {
                cmd.arg("-vf")
                    .arg(format!("scale=iw/{d}:ih/{d}", d = scale_divisor))
                    .arg("-c:v")
                    .arg(task.codec.codec_id())
                    .arg("-q:v")
                    .arg(quality.to_string());
            }
            CodecParams::Lossless { compression_level } => {
                cmd.arg("-c:v")
                    .arg(task.codec.codec_id())
                    .arg("-lossless")
                    .arg("1")
                    .arg("-compression_level")
                    .arg(compression_level.to_string());
            }
        }

        cmd.arg(&task.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, task: &ConversionTask) -> EncodeOutcome {
        let mut cmd = self.command(task);
        trace!("Running {:?}", cmd);

        match cmd.output() {
            Ok(output) => {
                debug!("{} exited with {} for {:?}", self.program, output.status, task.source);
                EncodeOutcome::Finished {
                    success: output.status.success(),
                    stderr: output.stderr,
                }
            }
            Err(e) => EncodeOutcome::SpawnFailed(format!("failed to start {}: {}", self.program, e)),
        }
    }
}

/// Where an encoder program lives and what it reports as its version
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub program: String,
    pub path: PathBuf,
    /// First line of `-version` output
    pub version: Option<String>,
}

/// Resolve `program` to an executable.
///
/// A value containing a path separator is taken as a path and must exist;
/// a bare name is searched for in `PATH`.
pub fn locate(program: &str) -> Result<ToolInfo> {
    let explicit = Path::new(program);
    let path = if explicit.components().count() > 1 {
        if !explicit.is_file() {
            return Err(WebpBatchError::tool_not_found(program));
        }
        explicit.to_path_buf()
    } else {
        which::which(program).map_err(|_| WebpBatchError::tool_not_found(program))?
    };

    let version = Command::new(&path)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|line| line.trim().to_string())
        })
        .filter(|line| !line.is_empty());

    Ok(ToolInfo {
        program: program.to_string(),
        path,
        version,
    })
}

/// [`locate`] on the blocking pool, for callers already on the runtime
pub async fn locate_blocking(program: &str) -> Result<ToolInfo> {
    let program = program.to_string();
    tokio::task::spawn_blocking(move || locate(&program))
        .await
        .map_err(|e| WebpBatchError::IoError(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionProfile;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_thumbnail_command() {
        let profile = ConversionProfile::new(
            "public/images/whiteboards",
            "public/images/whiteboards_small",
            "*.webp",
            CodecParams::ScaledLossy { scale_divisor: 3, quality: 80 },
        );
        let task = ConversionTask::for_profile(
            PathBuf::from("public/images/whiteboards/f1.webp"),
            &profile,
        );

        let cmd = FfmpegEncoder::default().command(&task);
        assert_eq!(cmd.get_program(), "ffmpeg");
        assert_eq!(
            args_of(&cmd),
            vec![
                "-y",
                "-i",
                "public/images/whiteboards/f1.webp",
                "-vf",
                "scale=iw/3:ih/3",
                "-c:v",
                "libwebp",
                "-q:v",
                "80",
                "public/images/whiteboards_small/f1.webp",
            ]
        );
    }

    #[test]
    fn test_lossless_command() {
        let profile = ConversionProfile::new(
            "raw",
            "out",
            "*.png",
            CodecParams::Lossless { compression_level: 6 },
        );
        let task = ConversionTask::for_profile(PathBuf::from("raw/f2.png"), &profile);

        let cmd = FfmpegEncoder::new("/usr/local/bin/ffmpeg").command(&task);
        assert_eq!(cmd.get_program(), "/usr/local/bin/ffmpeg");
        assert_eq!(
            args_of(&cmd),
            vec![
                "-y",
                "-i",
                "raw/f2.png",
                "-c:v",
                "libwebp",
                "-lossless",
                "1",
                "-compression_level",
                "6",
                "out/f2.webp",
            ]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let profile = ConversionProfile::new(
            "raw",
            "out",
            "*.png",
            CodecParams::Lossless { compression_level: 6 },
        );
        let task = ConversionTask::for_profile(PathBuf::from("raw/f2.png"), &profile);

        let encoder = FfmpegEncoder::new("webpbatch-no-such-encoder");
        match encoder.encode(&task) {
            EncodeOutcome::SpawnFailed(message) => {
                assert!(message.contains("webpbatch-no-such-encoder"));
            }
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_missing_tool() {
        let err = locate("webpbatch-no-such-encoder").unwrap_err();
        assert!(matches!(err, WebpBatchError::ToolNotFound { .. }));

        let err = locate("/nonexistent/dir/ffmpeg").unwrap_err();
        assert!(matches!(err, WebpBatchError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_locate_blocking_matches_locate() {
        let err = locate_blocking("webpbatch-no-such-encoder").await.unwrap_err();
        assert!(matches!(err, WebpBatchError::ToolNotFound { .. }));
    }
}
