// Artifact emission: the run directory layout, canonical JSON/JSONL
// writers, and the CSV writer for mark-out rows. Ported from the
// reference runner's `artifacts.py` (`ArtifactPaths`, `make_run_dir`,
// `write_json`, `append_jsonl`, `write_csv`).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::canonical::canonical_json;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("run directory already exists: {}", .0.display())]
    RunDirExists(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Paths within one `<run_id>_<UTC>/` run directory (§6).
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub spec_json: PathBuf,
    pub manifest_json: PathBuf,
    pub replay_token_json: PathBuf,
    pub audit_jsonl: PathBuf,
    pub fills_jsonl: PathBuf,
    pub events_jsonl: PathBuf,
    pub metrics_json: PathBuf,
    pub markout_csv: PathBuf,
}

/// Creates `<root>/<run_id>_<timestamp_utc>/`, failing if it already
/// exists (§4.6 step 3) — the run-id + timestamp pair is expected to be
/// unique per invocation, so collision means something is wrong.
pub fn make_run_dir(root: &Path, run_id: &str, timestamp_utc: &str) -> Result<ArtifactPaths, ArtifactError> {
    fs::create_dir_all(root)?;
    let run_dir = root.join(format!("{run_id}_{timestamp_utc}"));
    match fs::create_dir(&run_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(ArtifactError::RunDirExists(run_dir));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(ArtifactPaths {
        spec_json: run_dir.join("spec.json"),
        manifest_json: run_dir.join("manifest.json"),
        replay_token_json: run_dir.join("replay_token.json"),
        audit_jsonl: run_dir.join("audit.jsonl"),
        fills_jsonl: run_dir.join("fills.jsonl"),
        events_jsonl: run_dir.join("events.jsonl"),
        metrics_json: run_dir.join("metrics.json"),
        markout_csv: run_dir.join("markout.csv"),
        run_dir,
    })
}

/// Writes one canonical JSON object, trailing-newline terminated,
/// overwriting any existing file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let text = canonical_json(value)?;
    fs::write(path, format!("{text}\n"))?;
    Ok(())
}

/// Appends one canonical JSON object per row, newline-terminated. A no-op
/// on an empty slice so a dry checkpoint never creates an empty file.
pub fn append_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ArtifactError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    for row in rows {
        let text = canonical_json(row)?;
        writeln!(f, "{text}")?;
    }
    Ok(())
}

/// Writes a plain CSV: header row, then one row of already-stringified
/// fields per entry. A no-op on an empty `rows` — no mark-out completions
/// means no `markout.csv` is produced.
pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<(), ArtifactError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut f = File::create(path)?;
    writeln!(f, "{}", header.join(","))?;
    for row in rows {
        writeln!(f, "{}", row.join(","))?;
    }
    Ok(())
}
