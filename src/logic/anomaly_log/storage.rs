use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::LogDocument;

/// Read the log document. Missing, unreadable or corrupt files give None.
pub fn read_document(path: &Path) -> Option<LogDocument> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to read anomaly log {}: {}", path.display(), e);
            }
            return None;
        }
    };

    match serde_json::from_slice(&data) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::warn!("Anomaly log {} is corrupt, treating as empty: {}", path.display(), e);
            None
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the whole document to a temp file, then rename over the target
pub fn write_document(path: &Path, doc: &LogDocument) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(doc)?;
    let tmp = temp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}
