//! Local draft cache keyed by job id: the builder's section list and the
//! preview's in-progress responses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use assessment_spec::{ResponseMap, SectionSpec};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

pub trait DraftStore: Send + Sync {
    fn load_sections(&self, job_id: &str) -> RuntimeResult<Option<Vec<SectionSpec>>>;
    fn save_sections(&self, job_id: &str, sections: &[SectionSpec]) -> RuntimeResult<()>;
    fn load_responses(&self, job_id: &str) -> RuntimeResult<Option<ResponseMap>>;
    fn save_responses(&self, job_id: &str, responses: &ResponseMap) -> RuntimeResult<()>;
    fn clear(&self, job_id: &str) -> RuntimeResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    sections: RwLock<HashMap<String, Vec<SectionSpec>>>,
    responses: RwLock<HashMap<String, ResponseMap>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for InMemoryDraftStore {
    fn load_sections(&self, job_id: &str) -> RuntimeResult<Option<Vec<SectionSpec>>> {
        Ok(self.sections.read().get(job_id).cloned())
    }

    fn save_sections(&self, job_id: &str, sections: &[SectionSpec]) -> RuntimeResult<()> {
        self.sections
            .write()
            .insert(job_id.to_string(), sections.to_vec());
        Ok(())
    }

    fn load_responses(&self, job_id: &str) -> RuntimeResult<Option<ResponseMap>> {
        Ok(self.responses.read().get(job_id).cloned())
    }

    fn save_responses(&self, job_id: &str, responses: &ResponseMap) -> RuntimeResult<()> {
        self.responses
            .write()
            .insert(job_id.to_string(), responses.clone());
        Ok(())
    }

    fn clear(&self, job_id: &str) -> RuntimeResult<()> {
        self.sections.write().remove(job_id);
        self.responses.write().remove(job_id);
        Ok(())
    }
}

/// One JSON file per job and kind under a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sections_path(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("assessment_draft_{}.json", file_key(job_id)))
    }

    pub fn responses_path(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("assessment_responses_{}.json", file_key(job_id)))
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> RuntimeResult<Option<T>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| RuntimeError::DraftStore(format!("{}: {}", path.display(), err)))
    }

    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> RuntimeResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "draft written");
        Ok(())
    }

    fn remove(path: &Path) -> RuntimeResult<()> {
        match std::fs::remove_file(path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

// Job ids come from users. Bytes outside `[A-Za-z0-9_-]` are written as `%XX`, so distinct
// ids always map to distinct file names.
fn file_key(job_id: &str) -> String {
    let mut key = String::with_capacity(job_id.len());
    for byte in job_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            key.push(char::from(byte));
        } else {
            key.push_str(&format!("%{byte:02X}"));
        }
    }
    key
}

impl DraftStore for FileDraftStore {
    fn load_sections(&self, job_id: &str) -> RuntimeResult<Option<Vec<SectionSpec>>> {
        self.read(&self.sections_path(job_id))
    }

    fn save_sections(&self, job_id: &str, sections: &[SectionSpec]) -> RuntimeResult<()> {
        self.write(&self.sections_path(job_id), sections)
    }

    fn load_responses(&self, job_id: &str) -> RuntimeResult<Option<ResponseMap>> {
        self.read(&self.responses_path(job_id))
    }

    fn save_responses(&self, job_id: &str, responses: &ResponseMap) -> RuntimeResult<()> {
        self.write(&self.responses_path(job_id), responses)
    }

    fn clear(&self, job_id: &str) -> RuntimeResult<()> {
        Self::remove(&self.sections_path(job_id))?;
        Self::remove(&self.responses_path(job_id))
    }
}
