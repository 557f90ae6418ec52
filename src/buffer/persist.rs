//! Reading and atomically writing documents on disk.
//!
//! The on-disk format is plain text: lines joined by `\n`, with no trailing
//! separator added on write. Carriage returns before a line break are dropped
//! on read and never written back.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::utils::guard::ExitGuard;

/// Split raw text into document lines.
///
/// Always yields at least one line. A trailing `\n` produces a final empty
/// line, so a later [`join_lines`] reproduces the input byte-for-byte
/// (modulo stripped carriage returns).
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Join lines with a single `\n` and no trailing separator.
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

/// Read a document from `path`.
///
/// Returns `Ok(None)` when the file does not exist so callers can start with an
/// empty document. Invalid UTF-8 is replaced rather than rejected.
pub fn read_document(path: &Path) -> anyhow::Result<Option<Vec<String>>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist yet, starting empty", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let text = String::from_utf8_lossy(&raw);
    Ok(Some(split_lines(&text)))
}

/// Write `lines` to `path` atomically.
///
/// Content goes to a sibling temporary file which is flushed, synced and
/// closed before being renamed over the destination. On any failure the
/// temporary file is removed and the destination is left untouched.
pub fn write_document(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;

    let tmp = temp_path_for(path);
    let cleanup_path = tmp.clone();
    let cleanup = ExitGuard::with(move || {
        if let Err(e) = fs::remove_file(&cleanup_path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", cleanup_path.display(), e);
            }
        }
    });

    {
        let file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create temp file: {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                writer
                    .write_all(b"\n")
                    .with_context(|| format!("Failed to write {}", tmp.display()))?;
            }
            writer
                .write_all(line.as_bytes())
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", tmp.display()))?;
        // file closes here, before the rename
    }

    fs::rename(&tmp, path).with_context(|| {
        format!("Failed to replace {} with {}", path.display(), tmp.display())
    })?;
    cleanup.dismiss();
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// `dir/name` -> `dir/.name.<pid>.tmp`, so the rename never crosses filesystems.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}
