use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::{
    foundation::error::{LimboError, LimboResult},
    metadata::model::Annotation,
};

/// Top-level JSON object of one sample.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One sample's JSON metadata record and the file it lives in.
///
/// Reads never touch the disk after [`load`](Self::load); every
/// [`update`](Self::update) merges and persists in one step.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataStore {
    path: PathBuf,
    record: Record,
}

impl MetadataStore {
    /// Read and parse the metadata file at `path`.
    pub fn load(path: impl AsRef<Path>) -> LimboResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LimboError::io_at(path, e))?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            LimboError::decode(format!("metadata '{}': {e}", path.display()))
        })?;
        let serde_json::Value::Object(record) = value else {
            return Err(LimboError::decode(format!(
                "metadata '{}' is not a JSON object",
                path.display()
            )));
        };
        Ok(Self {
            path: path.to_path_buf(),
            record,
        })
    }

    /// Wrap an in-memory record that will persist to `path`.
    pub fn from_record(path: impl Into<PathBuf>, record: Record) -> Self {
        Self {
            path: path.into(),
            record,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.record.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.record.contains_key(key)
    }

    /// Typed view of the top-level `key`, `None` when the key is absent.
    pub fn block<T: DeserializeOwned>(&self, key: &str) -> LimboResult<Option<T>> {
        self.record
            .get(key)
            .map(|value| {
                T::deserialize(value).map_err(|e| {
                    LimboError::decode(format!(
                        "metadata '{}' key '{key}': {e}",
                        self.path.display()
                    ))
                })
            })
            .transpose()
    }

    /// The `annotations` list, empty when absent.
    pub fn annotations(&self) -> LimboResult<Vec<Annotation>> {
        Ok(self.block("annotations")?.unwrap_or_default())
    }

    /// Shallow-merge `updates` into the record, then persist it.
    ///
    /// The in-memory record changes only once the file has been replaced; a failed
    /// write leaves both untouched.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub fn update(&mut self, updates: Record) -> LimboResult<()> {
        let mut merged = self.record.clone();
        merged.extend(updates);
        write_record(&self.path, &merged)?;
        self.record = merged;
        Ok(())
    }

    /// Write the record as pretty JSON with sorted keys.
    ///
    /// Goes through a sibling temporary file renamed over the target.
    pub fn persist(&self) -> LimboResult<()> {
        write_record(&self.path, &self.record)
    }
}

fn write_record(path: &Path, record: &Record) -> LimboResult<()> {
    let mut text = serde_json::to_string_pretty(record)
        .map_err(|e| LimboError::validation(format!("serialize metadata: {e}")))?;
    text.push('\n');

    let tmp = temp_sibling(path);
    std::fs::write(&tmp, text).map_err(|e| LimboError::io_at(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        LimboError::io_at(path, e)
    })?;
    tracing::debug!(path = %path.display(), "persisted metadata");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/store.rs"]
mod tests;
