//! Input discovery and output layout

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CodecParams;
use crate::error::{Result, WebpBatchError};

/// List regular files directly inside `source_dir` whose name matches
/// `pattern`, sorted by name. No match is an empty list, not an error.
pub fn enumerate(source_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !source_dir.is_dir() {
        return Err(WebpBatchError::source_missing(source_dir.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", source_dir, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if wildcard_match(pattern, &name) {
            files.push(entry.into_path());
        }
    }

    debug!("Matched {} files in {:?} with {:?}", files.len(), source_dir, pattern);
    Ok(files)
}

/// Create `dest_dir` and its parents if missing.
///
/// An existing directory is left alone. Anything else in the way (a file at
/// the path or at one of its parents) is a [`WebpBatchError::DestinationBlocked`].
pub async fn ensure_destination(dest_dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dest_dir).await {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(WebpBatchError::destination_blocked(
                dest_dir.to_path_buf(),
                "it exists and is not a directory",
            ))
        }
        Err(_) => {}
    }

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| WebpBatchError::destination_blocked(dest_dir.to_path_buf(), e.to_string()))?;

    debug!("Created destination directory {:?}", dest_dir);
    Ok(())
}

/// Output path for `source`: its stem with the codec's extension, inside `dest_dir`
pub fn output_path_for(source: &Path, dest_dir: &Path, codec: CodecParams) -> PathBuf {
    let stem = source
        .file_stem()
        .unwrap_or_else(|| source.as_os_str());

    let mut file_name = OsString::from(stem);
    file_name.push(".");
    file_name.push(codec.extension());

    dest_dir.join(file_name)
}

/// Shell-style wildcard match on a file name.
///
/// `*` matches any run of characters, `?` exactly one, everything else is
/// literal. Matching is case-sensitive, as a POSIX shell glob is.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Position of the last `*` seen and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    n = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.webp", "a.webp"));
        assert!(wildcard_match("*.webp", ".webp"));
        assert!(!wildcard_match("*.webp", "a.webp.bak"));
        assert!(!wildcard_match("*.webp", "a.WEBP"));
        assert!(wildcard_match("board-?.png", "board-3.png"));
        assert!(!wildcard_match("board-?.png", "board-10.png"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
        assert!(wildcard_match("exact.png", "exact.png"));
    }

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.webp", "a.webp", "notes.txt", "c.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.webp")).unwrap();
        std::fs::write(dir.path().join("nested.webp/d.webp"), b"x").unwrap();

        let files = enumerate(dir.path(), "*.webp").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.webp", "b.webp"]);
    }

    #[test]
    fn test_enumerate_no_match_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        assert!(enumerate(dir.path(), "*.webp").unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = enumerate(&dir.path().join("missing"), "*.webp").unwrap_err();
        assert!(matches!(err, WebpBatchError::SourceMissing { .. }));
    }

    #[tokio::test]
    async fn test_ensure_destination_creates_parents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("public/images/whiteboards_small");

        ensure_destination(&dest).await.unwrap();
        assert!(dest.is_dir());

        // Present already: no-op
        ensure_destination(&dest).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_destination_blocked_by_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = ensure_destination(&blocker).await.unwrap_err();
        assert!(matches!(err, WebpBatchError::DestinationBlocked { .. }));
        assert!(err.user_message().contains("it exists and is not a directory"));

        // Blocked by a parent component: the message carries the OS reason
        let nested = blocker.join("nested");
        let err = ensure_destination(&nested).await.unwrap_err();
        match &err {
            WebpBatchError::DestinationBlocked { path, reason } => {
                assert_eq!(path, &nested);
                assert!(err.user_message().contains(reason.as_str()));
                assert!(!err.user_message().contains("it exists"));
            }
            other => panic!("expected a blocked destination, got {:?}", other),
        }
    }

    #[test]
    fn test_output_path_for() {
        let codec = CodecParams::ScaledLossy { scale_divisor: 3, quality: 80 };
        let out = output_path_for(Path::new("in/floor2.board.png"), Path::new("out"), codec);
        assert_eq!(out, PathBuf::from("out/floor2.board.webp"));

        let out = output_path_for(Path::new("in/a.webp"), Path::new("out"), codec);
        assert_eq!(out, PathBuf::from("out/a.webp"));
    }
}
