//! Manifest persistence: the ordered set of enumerated references, one JSON
//! object per line.
//!
//! The manifest is transient intermediate state — append-only during
//! enumeration, read-only during resolution, removed after a successful
//! aggregation.

use crate::errors::HarvestError;
use crate::records::CandidateReference;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

/// Write a full manifest, replacing any existing file.
pub fn write_manifest(path: &Path, refs: &[CandidateReference]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    for r in refs {
        let line = serde_json::to_string(r)?;
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    info!("manifest written: {} references to {}", refs.len(), path.display());
    Ok(())
}

/// Append references to an existing (or new) manifest.
pub fn append_manifest(path: &Path, refs: &[CandidateReference]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for r in refs {
        let line = serde_json::to_string(r)?;
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Read a manifest back, preserving order.
///
/// A missing or malformed manifest is a configuration error for a
/// resolution-only run, so both surface as `Persistence` failures.
pub fn read_manifest(path: &Path) -> Result<Vec<CandidateReference>, HarvestError> {
    let file = File::open(path).map_err(|e| {
        HarvestError::Persistence(format!("cannot open manifest {}: {e}", path.display()))
    })?;

    let mut refs = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let r: CandidateReference = serde_json::from_str(&line).map_err(|e| {
            HarvestError::Persistence(format!(
                "malformed manifest line {} in {}: {e}",
                idx + 1,
                path.display()
            ))
        })?;
        refs.push(r);
    }
    Ok(refs)
}

/// Remove a consumed manifest; failure is logged, never fatal.
pub fn remove_manifest(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("manifest removed: {}", path.display()),
        Err(e) => warn!("could not remove manifest {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Region;

    fn refs() -> Vec<CandidateReference> {
        let region = Region {
            key: "namdaemun".to_string(),
            name: "남대문".to_string(),
            url: "https://www.diningcode.com/list.dc?query=남대문".to_string(),
        };
        vec![
            CandidateReference::new(&region, 1, "곰탕집", "https://www.diningcode.com/P/1"),
            CandidateReference::new(&region, 2, "분식당", "https://www.diningcode.com/P/2"),
        ]
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phase1_links.jsonl");

        write_manifest(&path, &refs()).unwrap();
        let loaded = read_manifest(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].link_id, "namdaemun_0001");
        assert_eq!(loaded[1].url, "https://www.diningcode.com/P/2");
    }

    #[test]
    fn test_append_extends_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.jsonl");
        let all = refs();

        append_manifest(&path, &all[..1]).unwrap();
        append_manifest(&path, &all[1..]).unwrap();

        assert_eq!(read_manifest(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_manifest_is_persistence_error() {
        let err = read_manifest(Path::new("/nonexistent/m.jsonl")).unwrap_err();
        assert!(matches!(err, HarvestError::Persistence(_)));
    }

    #[test]
    fn test_malformed_line_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, HarvestError::Persistence(msg) if msg.contains("line 1")));
    }

    #[test]
    fn test_remove_is_best_effort() {
        // Removing a nonexistent manifest must not panic.
        remove_manifest(Path::new("/nonexistent/m.jsonl"));
    }
}
