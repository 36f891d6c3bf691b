//! Publishing finished files to their final location.
//!
//! A published path only ever holds a complete file: data is written next to
//! the destination first and renamed into place.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::ComposeResult;

/// Move `src` to `dst`, replacing any existing file.
///
/// Tries a plain rename first. Across filesystems (EXDEV) the file is copied
/// to a sibling temp file of `dst` and renamed from there, so `dst` never
/// holds a partial copy.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> ComposeResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device publish, copying through temp file"
            );
            copy_atomic(src, dst).await?;
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!(src = %src.display(), error = %e, "Failed to remove source after copy");
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy `src` to `dst` through a sibling temp file, keeping `src`.
pub async fn copy_atomic(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> ComposeResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;
    let tmp = staging_path(dst);

    if let Err(e) = fs::copy(src, &tmp).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, dst).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Sibling path used while a file is being published.
fn staging_path(dst: &Path) -> PathBuf {
    let mut name = dst
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dst.with_file_name(name)
}

async fn ensure_parent(path: &Path) -> ComposeResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.mp4");
        let dst = dir.path().join("out").join("final.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::create_dir_all(dst.parent().unwrap()).await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
        assert!(!staging_path(&dst).exists());
    }

    #[tokio::test]
    async fn test_move_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("nested").join("deeper").join("b.mp4");
        fs::write(&src, b"x").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_copy_atomic_keeps_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("subs.ass");
        let dst = dir.path().join("final.ass");
        fs::write(&src, b"[Script Info]").await.unwrap();

        copy_atomic(&src, &dst).await.unwrap();
        assert!(src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"[Script Info]");
    }

    #[test]
    fn test_staging_path_keeps_extension() {
        assert_eq!(
            staging_path(Path::new("/out/video.mp4")),
            PathBuf::from("/out/video.mp4.tmp")
        );
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
