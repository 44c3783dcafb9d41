//! All-or-nothing file publication.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{RefineError, RefineResult};

/// Write `bytes` to a temporary file next to `path` and rename it into place.
///
/// Readers of `path` see either the previous content or the complete new
/// content, never a partial write.
pub(crate) fn publish(path: &Path, bytes: &[u8]) -> RefineResult<()> {
    let write_err = |source| RefineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_publish_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.data");
        publish(&path, b"first").unwrap();
        publish(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // no stray temporaries left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_publish_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.data");
        let err = publish(&path, b"x").unwrap_err();
        match err {
            RefineError::Write { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
