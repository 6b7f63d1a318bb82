use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Error};
use bytes::Bytes;

use judger_dag::DataGroup;

/// A source of named byte streams for a data group, for example the files of a submission.
pub trait DataProvider: Send + Sync + std::fmt::Debug {
    /// The content of a field, `None` if the field does not exist.
    fn get(&self, field: &str) -> Result<Option<Bytes>, Error>;

    /// The names of all the fields.
    fn fields(&self) -> Result<Vec<String>, Error>;
}

/// A provider keeping all the fields in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryData {
    fields: BTreeMap<String, Bytes>,
}

impl MemoryData {
    /// An empty provider.
    pub fn new() -> MemoryData {
        MemoryData::default()
    }

    /// Add a field, consuming and returning the provider.
    pub fn with<S: Into<String>, B: Into<Bytes>>(mut self, field: S, content: B) -> MemoryData {
        self.insert(field, content);
        self
    }

    /// Add or replace a field.
    pub fn insert<S: Into<String>, B: Into<Bytes>>(&mut self, field: S, content: B) {
        self.fields.insert(field.into(), content.into());
    }
}

impl DataProvider for MemoryData {
    fn get(&self, field: &str) -> Result<Option<Bytes>, Error> {
        Ok(self.fields.get(field).cloned())
    }

    fn fields(&self) -> Result<Vec<String>, Error> {
        Ok(self.fields.keys().cloned().collect())
    }
}

/// A provider reading the fields from the files of a directory, one file per field.
#[derive(Debug, Clone)]
pub struct DirData {
    dir: PathBuf,
}

impl DirData {
    /// Read the fields from `dir`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> DirData {
        DirData { dir: dir.into() }
    }

    /// The directory with the fields.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DataProvider for DirData {
    fn get(&self, field: &str) -> Result<Option<Bytes>, Error> {
        if field.contains(['/', '\\']) || field == ".." {
            return Ok(None);
        }
        let path = self.dir.join(field);
        if !path.is_file() {
            return Ok(None);
        }
        let content =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(Bytes::from(content)))
    }

    fn fields(&self) -> Result<Vec<String>, Error> {
        let mut fields = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.path().is_file() {
                fields.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        fields.sort();
        Ok(fields)
    }
}

/// The data groups supplied to a workflow run.
#[derive(Debug, Clone, Default)]
pub struct InboundData {
    groups: HashMap<DataGroup, Arc<dyn DataProvider>>,
}

impl InboundData {
    /// No data groups.
    pub fn new() -> InboundData {
        InboundData::default()
    }

    /// Set a group, consuming and returning `self`.
    pub fn with(mut self, group: DataGroup, provider: Arc<dyn DataProvider>) -> InboundData {
        self.set(group, provider);
        self
    }

    /// Set or replace a group.
    pub fn set(&mut self, group: DataGroup, provider: Arc<dyn DataProvider>) {
        self.groups.insert(group, provider);
    }

    /// The provider of a group, if supplied.
    pub fn get(&self, group: DataGroup) -> Option<&Arc<dyn DataProvider>> {
        self.groups.get(&group)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_memory_data() {
        let data = MemoryData::new().with("b", "2").with("a", "1");
        assert_eq!(data.get("a").unwrap(), Some(Bytes::from("1")));
        assert_eq!(data.get("c").unwrap(), None);
        assert_eq!(data.fields().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_dir_data() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("source"), "int main() {}").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        let data = DirData::new(tmp.path());
        assert_eq!(data.get("source").unwrap(), Some(Bytes::from("int main() {}")));
        assert_eq!(data.get("option").unwrap(), None);
        assert_eq!(data.get("nested").unwrap(), None);
        assert_eq!(data.get("../source").unwrap(), None);
        assert_eq!(data.fields().unwrap(), vec!["source"]);
    }

    #[test]
    fn test_inbound_data() {
        let inbound = InboundData::new().with(
            DataGroup::Tests,
            Arc::new(MemoryData::new().with("input", "1 2")),
        );
        assert!(inbound.get(DataGroup::Submission).is_none());
        let tests = inbound.get(DataGroup::Tests).unwrap();
        assert_eq!(tests.get("input").unwrap(), Some(Bytes::from("1 2")));
    }
}
