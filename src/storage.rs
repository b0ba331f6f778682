// src/storage.rs
//
// Persistence collaborator: one JSON document per recorded path, keyed
// by the path id, under a flat data directory. The core only needs the
// semantic fields to round-trip; undecodable files are skipped with a
// warning so one corrupt path never hides the rest.

use crate::error::PipelineError;
use crate::types::RecordedPath;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct PathStore {
    data_dir: PathBuf,
}

impl PathStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Persist one path as `<id>.json`. Returns the file written.
    pub fn save(&self, path: &RecordedPath) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| PipelineError::Persistence(format!("create {:?}: {e}", self.data_dir)))?;

        let file = self.data_dir.join(format!("{}.json", path.id));
        let json = serde_json::to_string_pretty(path)
            .map_err(|e| PipelineError::Persistence(format!("encode path {}: {e}", path.id)))?;
        fs::write(&file, json)
            .map_err(|e| PipelineError::Persistence(format!("write {file:?}: {e}")))?;

        info!(id = %path.id, file = %file.display(), "path saved");
        Ok(file)
    }

    /// Load every stored path, oldest session first. A missing data
    /// directory just means nothing has been saved yet.
    pub fn load_all(&self) -> Result<Vec<RecordedPath>, PipelineError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(file)
                .map_err(|e| PipelineError::Persistence(format!("read {file:?}: {e}")))?;
            match serde_json::from_str::<RecordedPath>(&contents) {
                Ok(path) => paths.push(path),
                Err(e) => warn!(file = %file.display(), error = %e, "skipping undecodable path file"),
            }
        }

        paths.sort_by_key(|p| p.start_time);
        Ok(paths)
    }
}
