use crate::error::{ErrorKind, Result};
use dataname_naming::FilenameRecord;
use exn::ResultExt;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// The set of dataset names that have a schema definition.
///
/// Built once with [`load`](Self::load) and passed by reference to whatever
/// needs to ask about names. Each regular, non-hidden file in the folder
/// contributes its name with the last extension stripped: `sales.json`
/// declares `sales`, `sales.eu.json` declares `sales.eu`. Names are kept in
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaIndex {
    names: Vec<String>,
    schemas: BTreeMap<String, Value>,
}

impl SchemaIndex {
    /// Scan `folder` for schema definitions.
    ///
    /// Files ending in `.json` are parsed and their bodies kept for
    /// [`schema`](Self::schema). Other files only contribute their name.
    ///
    /// # Errors
    ///
    /// [`SchemaFolderMissing`](ErrorKind::SchemaFolderMissing) if `folder`
    /// isn't a directory, [`Io`](ErrorKind::Io) if it can't be read, and
    /// [`InvalidSchema`](ErrorKind::InvalidSchema) for a malformed JSON file.
    #[tracing::instrument(level = "debug", skip_all, fields(folder = %folder.as_ref().display()))]
    pub fn load(folder: impl AsRef<Path>) -> Result<Self> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            exn::bail!(ErrorKind::SchemaFolderMissing(folder.to_path_buf()));
        }

        let mut names = BTreeSet::new();
        let mut schemas = BTreeMap::new();
        for entry in fs::read_dir(folder).or_raise(|| ErrorKind::Io(folder.to_path_buf()))? {
            let entry = entry.or_raise(|| ErrorKind::Io(folder.to_path_buf()))?;
            let path = entry.path();
            let file_type = entry.file_type().or_raise(|| ErrorKind::Io(path.clone()))?;
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::debug!(path = %path.display(), "Skipping schema file with a non-UTF-8 name");
                continue;
            };
            if file_name.starts_with('.') || file_type.is_dir() {
                continue;
            }
            let Some((name, extension)) = file_name.rsplit_once('.') else {
                tracing::debug!(file_name, "Skipping schema file without an extension");
                continue;
            };

            if extension.eq_ignore_ascii_case("json") {
                let body = fs::read(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
                let value: Value =
                    serde_json::from_slice(&body).or_raise(|| ErrorKind::InvalidSchema(name.to_string()))?;
                schemas.insert(name.to_string(), value);
            }
            names.insert(name.to_string());
        }

        tracing::debug!(count = names.len(), "Loaded schema index");
        Ok(Self {
            names: names.into_iter().collect(),
            schemas,
        })
    }

    /// An index of bare names, without any schema bodies.
    pub fn from_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            names: names.into_iter().collect(),
            schemas: BTreeMap::new(),
        }
    }

    /// All known dataset names, in lexicographic order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.binary_search_by(|known| known.as_str().cmp(name)).is_ok()
    }

    /// The parsed body of `name.json`, if there was one.
    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether a record is a CSV data file for a known dataset.
///
/// True when the record matched the naming convention, its extension is
/// `csv` (in any case), and its name has a schema.
pub fn is_data_csv(record: &FilenameRecord, index: &SchemaIndex) -> bool {
    record.matched && record.has_extension("csv") && record.name.as_deref().is_some_and(|name| index.has_name(name))
}
