// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Session container codec.
//!
//! The browser persists its session as a __mozLz4__ container: an 8-byte
//! literal magic `mozLz40\0`, a 4-byte little-endian unsigned integer giving
//! the uncompressed payload size, then the payload compressed with the LZ4
//! _block_ format (not the framed format). The decompressed bytes are UTF-8
//! JSON matching [`SessionDocument`].
//!
//! # Write Discipline
//!
//! The session file is the one resource this tool can destroy, so writes are
//! paranoid. [`write`] serializes to a temporary file in the destination
//! directory and atomically renames it over the target, which means a crash
//! mid-write leaves the original untouched. [`backup`] copies the current
//! file to a timestamped sibling; the applier refuses to write without one.
//! The codec itself stays backup-agnostic, sequencing is the caller's job.

use crate::session::SessionDocument;

use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Magic signature opening every mozLz4 container.
pub const MAGIC: &[u8; 8] = b"mozLz40\0";

/// Byte length of magic plus the little-endian size field.
const HEADER_LEN: usize = MAGIC.len() + 4;

/// Read and decode a session container.
///
/// # Errors
///
/// - Return [`CodecError::Truncated`] if the file is shorter than its header.
/// - Return [`CodecError::Format`] if the magic signature is absent.
/// - Return [`CodecError::Corruption`] if decompression fails or the
///   decompressed size does not equal the declared size.
/// - Return [`CodecError::Parse`] if the payload is not valid session JSON.
#[instrument(level = "debug")]
pub fn read(path: &Path) -> Result<SessionDocument> {
    let bytes = fs::read(path).map_err(|err| CodecError::Io {
        source: err,
        path: path.to_owned(),
    })?;

    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            path: path.to_owned(),
            len: bytes.len(),
        });
    }

    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(CodecError::Format {
            path: path.to_owned(),
        });
    }

    let declared = u32::from_le_bytes(bytes[MAGIC.len()..HEADER_LEN].try_into().unwrap()) as usize;
    let payload = lz4_flex::block::decompress(&bytes[HEADER_LEN..], declared).map_err(|err| {
        CodecError::Corruption {
            path: path.to_owned(),
            reason: err.to_string(),
        }
    })?;

    // INVARIANT: Declared size is authoritative, a short payload means the
    // container was truncated or tampered with.
    if payload.len() != declared {
        return Err(CodecError::Corruption {
            path: path.to_owned(),
            reason: format!("declared {declared} bytes, decompressed {}", payload.len()),
        });
    }

    debug!("decompressed {} bytes from {:?}", payload.len(), path.display());
    serde_json::from_slice(&payload).map_err(|err| CodecError::Parse {
        source: err,
        path: path.to_owned(),
    })
}

/// Encode and write a session container atomically.
///
/// Serializes into a temporary file beside the destination, then renames it
/// into place so an interrupted write never leaves a partial container.
///
/// # Errors
///
/// - Return [`CodecError::Parse`] if the document cannot be serialized.
/// - Return [`CodecError::Io`] if the temporary file cannot be written or
///   renamed over the destination.
#[instrument(skip(doc), level = "debug")]
pub fn write(path: &Path, doc: &SessionDocument) -> Result<()> {
    let payload = serde_json::to_vec(doc).map_err(|err| CodecError::Parse {
        source: err,
        path: path.to_owned(),
    })?;
    let compressed = lz4_flex::block::compress(&payload);

    let mut container = Vec::with_capacity(HEADER_LEN + compressed.len());
    container.extend_from_slice(MAGIC);
    container.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    container.extend_from_slice(&compressed);

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let io_error = |err: std::io::Error| CodecError::Io {
        source: err,
        path: path.to_owned(),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(&container).map_err(io_error)?;
    tmp.persist(path).map_err(|err| io_error(err.error))?;

    debug!(
        "wrote {} bytes ({} uncompressed) to {:?}",
        container.len(),
        payload.len(),
        path.display()
    );
    Ok(())
}

/// Copy the current session file to a timestamped backup path.
///
/// Produces `<file name>.<UTC timestamp>.bak` beside the original and
/// returns the path written.
///
/// # Errors
///
/// - Return [`CodecError::Io`] if the copy fails for any reason. Callers
///   performing a write must treat this as fatal before touching the real
///   file.
#[instrument(level = "debug")]
pub fn backup(path: &Path) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".into());
    let target = path.with_file_name(format!("{name}.{stamp}.bak"));

    fs::copy(path, &target).map_err(|err| CodecError::Io {
        source: err,
        path: target.clone(),
    })?;

    Ok(target)
}

/// Session container error types.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Container is too short to even hold a header.
    #[error("session file {:?} is truncated: {len} bytes is shorter than the {} byte header", path.display(), HEADER_LEN)]
    Truncated { path: PathBuf, len: usize },

    /// Magic signature missing at byte offset 0.
    #[error("{:?} is not a mozLz4 session file: bad magic at byte offset 0", path.display())]
    Format { path: PathBuf },

    /// Compressed payload does not decompress to the declared size.
    #[error("corrupt session payload in {:?}: {reason}", path.display())]
    Corruption { path: PathBuf, reason: String },

    /// Payload is not valid session JSON.
    #[error("malformed session JSON in {:?}", path.display())]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Container cannot be read or replaced on disk.
    #[error("failed to access session file at {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionDocument, Tab, Workspace};
    use pretty_assertions::assert_eq;

    fn sample_doc() -> SessionDocument {
        SessionDocument {
            spaces: vec![Workspace {
                id: "ws-1".into(),
                name: "Work".into(),
                extra: serde_json::Map::new(),
            }],
            tabs: vec![Tab {
                id: "t1".into(),
                url: "https://fly.io/apps".into(),
                group_id: None,
                pinned: true,
                placeholder: false,
                workspace_id: "ws-1".into(),
                extra: serde_json::Map::new(),
            }],
            ..SessionDocument::default()
        }
    }

    #[test]
    fn round_trip_preserves_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        let doc = sample_doc();

        write(&path, &doc).unwrap();
        let reread = read(&path).unwrap();

        assert_eq!(reread, doc);
    }

    #[test]
    fn read_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        let mut bytes = b"notLz40\0".to_vec();
        bytes.extend_from_slice(&42u32.to_le_bytes());
        bytes.extend_from_slice(b"garbage");
        fs::write(&path, bytes).unwrap();

        assert!(matches!(read(&path), Err(CodecError::Format { .. })));
    }

    #[test]
    fn read_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        fs::write(&path, b"mozLz4").unwrap();

        assert!(matches!(
            read(&path),
            Err(CodecError::Truncated { len: 6, .. })
        ));
    }

    #[test]
    fn read_rejects_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        write(&path, &sample_doc()).unwrap();

        // Inflate the declared size field past the real payload size.
        let mut bytes = fs::read(&path).unwrap();
        let declared = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        bytes[8..12].copy_from_slice(&(declared + 1).to_le_bytes());
        fs::write(&path, bytes).unwrap();

        assert!(matches!(read(&path), Err(CodecError::Corruption { .. })));
    }

    #[test]
    fn write_replaces_existing_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        write(&path, &sample_doc()).unwrap();

        let mut changed = sample_doc();
        changed.tabs[0].url = "https://fly.io/dashboard".into();
        write(&path, &changed).unwrap();

        assert_eq!(read(&path).unwrap(), changed);
    }

    #[test]
    fn backup_copies_current_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");
        write(&path, &sample_doc()).unwrap();
        let original = fs::read(&path).unwrap();

        let target = backup(&path).unwrap();

        assert!(target.file_name().unwrap().to_string_lossy().ends_with(".bak"));
        assert_eq!(fs::read(target).unwrap(), original);
    }

    #[test]
    fn backup_fails_without_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jsonlz4");

        assert!(matches!(backup(&path), Err(CodecError::Io { .. })));
    }
}
