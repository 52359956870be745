//! Tar pack/unpack of weight directory trees.
//!
//! Entry names are relative to the archived directory root, so
//! `archive_dir(dir)` followed by `extract_tar(bytes, dest)` reproduces the
//! directory's contents under `dest` byte-for-byte — the round-trip invariant the
//! weight cache depends on. Non-regular, non-directory entries (symlinks, devices)
//! are logged and skipped rather than failing the whole extract.

use ligcoord_protocol::CoordinatorError;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tar::{Archive, Builder, EntryType};
use tracing::warn;
use walkdir::WalkDir;

/// Archive `dir`'s contents into an in-memory tar byte stream.
pub fn archive_dir(dir: &Path) -> Result<Vec<u8>, CoordinatorError> {
    let mut buf = Vec::new();
    {
        let mut builder = Builder::new(&mut buf);

        for entry in WalkDir::new(dir).min_depth(1) {
            let entry = entry.map_err(|err| {
                CoordinatorError::archive(format!("error walking {}: {err}", dir.display()))
            })?;
            let path = entry.path();
            let rel = path.strip_prefix(dir).map_err(|err| {
                CoordinatorError::archive(format!(
                    "error computing relative path for {}: {err}",
                    path.display()
                ))
            })?;

            if entry.file_type().is_dir() {
                builder.append_dir(rel, path).map_err(|err| {
                    CoordinatorError::archive(format!(
                        "error writing directory header for {}: {err}",
                        path.display()
                    ))
                })?;
            } else if entry.file_type().is_file() {
                let mut file = File::open(path).map_err(|err| {
                    CoordinatorError::archive(format!(
                        "error opening {}: {err}",
                        path.display()
                    ))
                })?;
                builder.append_file(rel, &mut file).map_err(|err| {
                    CoordinatorError::archive(format!(
                        "error copying {} into archive: {err}",
                        path.display()
                    ))
                })?;
            } else {
                warn!(path = %path.display(), "skipping unsupported directory entry while archiving");
            }
        }

        builder.finish().map_err(|err| {
            CoordinatorError::archive(format!("error closing tar writer: {err}"))
        })?;
    }
    Ok(buf)
}

/// Extract a tar byte stream rooted at `dest`, creating `dest` if needed.
pub fn extract_tar(bytes: &[u8], dest: &Path) -> Result<(), CoordinatorError> {
    std::fs::create_dir_all(dest)
        .map_err(|err| CoordinatorError::archive(format!("error creating {}: {err}", dest.display())))?;

    let mut archive = Archive::new(Cursor::new(bytes));
    let entries = archive.entries().map_err(|err| {
        CoordinatorError::archive(format!("error reading tar entries: {err}"))
    })?;

    for entry in entries {
        let mut entry =
            entry.map_err(|err| CoordinatorError::archive(format!("error reading tar entry: {err}")))?;
        let entry_type = entry.header().entry_type();
        let rel_path = entry
            .path()
            .map_err(|err| CoordinatorError::archive(format!("error reading entry path: {err}")))?
            .into_owned();

        match entry_type {
            EntryType::Directory | EntryType::Regular => {
                let target = dest.join(&rel_path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        CoordinatorError::archive(format!(
                            "error creating directory {}: {err}",
                            parent.display()
                        ))
                    })?;
                }
                entry.unpack(&target).map_err(|err| {
                    CoordinatorError::archive(format!(
                        "error extracting {}: {err}",
                        target.display()
                    ))
                })?;
            }
            other => {
                warn!(?other, path = %rel_path.display(), "ignoring unsupported tar entry type");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn archive_then_extract_reproduces_tree_byte_for_byte() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("nested")).unwrap();
        fs::write(src.path().join("a.bin"), b"hello").unwrap();
        fs::write(src.path().join("nested/b.bin"), b"world").unwrap();

        let archived = archive_dir(src.path()).unwrap();

        let dest = tempdir().unwrap();
        extract_tar(&archived, dest.path()).unwrap();

        assert_eq!(fs::read(dest.path().join("a.bin")).unwrap(), b"hello");
        assert_eq!(fs::read(dest.path().join("nested/b.bin")).unwrap(), b"world");
    }

    #[cfg(unix)]
    #[test]
    fn regular_file_mode_is_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempdir().unwrap();
        let file_path = src.path().join("exec.sh");
        fs::write(&file_path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o755)).unwrap();

        let archived = archive_dir(src.path()).unwrap();

        let dest = tempdir().unwrap();
        extract_tar(&archived, dest.path()).unwrap();

        let mode = fs::metadata(dest.path().join("exec.sh"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn empty_directory_round_trips() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();

        let archived = archive_dir(src.path()).unwrap();
        let dest = tempdir().unwrap();
        extract_tar(&archived, dest.path()).unwrap();

        assert!(dest.path().join("empty").is_dir());
    }
}
