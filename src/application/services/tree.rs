//! Document flatten/unflatten service
//!
//! Reads element documents and flat record files, runs them through the
//! domain pipelines with the configured options, and renders the results.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::document::{
    build_tree, from_records, parse_document, parse_records, to_doc, to_records, to_toml,
    ElementDoc, FlatDocument,
};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{flatten_with, unflatten_with, Element, NodeRef};
use crate::infrastructure::traits::FileSystem;

/// Service running documents through flatten and unflatten.
pub struct TreeService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TreeService {
    /// Create a new tree service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Read and parse a nested element document.
    pub fn load_document(&self, path: &Path) -> ApplicationResult<ElementDoc> {
        self.ensure_exists(path)?;
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read document", path)?;
        parse_document(&content, path)
    }

    /// Read and parse a flat record file.
    pub fn load_records(&self, path: &Path) -> ApplicationResult<FlatDocument> {
        self.ensure_exists(path)?;
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read records", path)?;
        parse_records(&content, path)
    }

    /// Build a keyed node tree from the document at `path`.
    pub fn build(&self, path: &Path) -> ApplicationResult<NodeRef<Element>> {
        let doc = self.load_document(path)?;
        let mut keys = self.settings.key_generator();
        Ok(build_tree(&doc, keys.as_mut()))
    }

    /// Assign keys to the document at `path` and flatten it into records.
    #[instrument(level = "debug", skip(self))]
    pub fn flatten_document(&self, path: &Path) -> ApplicationResult<FlatDocument> {
        let root = self.build(path)?;
        let flat = flatten_with(root, &self.settings.flatten_options())?;
        debug!("flatten_document: {} records", flat.len());
        Ok(to_records(&flat))
    }

    /// Relink the records at `path` and return the root nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn unflatten_records(&self, path: &Path) -> ApplicationResult<Vec<NodeRef<Element>>> {
        let records = self.load_records(path)?;
        let entities = from_records(records);
        let roots = unflatten_with(entities, &self.settings.unflatten_options())?;
        debug!("unflatten_records: {} roots", roots.len());
        Ok(roots)
    }

    /// Convert relinked roots into nested documents.
    pub fn to_documents(&self, roots: &[NodeRef<Element>]) -> ApplicationResult<Vec<ElementDoc>> {
        roots.iter().map(to_doc).collect()
    }

    /// Serialize `value` as TOML and write it to `path`, or return it for stdout.
    pub fn render<S: serde::Serialize>(
        &self,
        value: &S,
        path: Option<&Path>,
    ) -> ApplicationResult<Option<String>> {
        let text = to_toml(value)?;
        match path {
            Some(path) => {
                self.fs
                    .ensure_parent(path)
                    .with_path_context("create parent directory", path)?;
                self.fs
                    .write(path, &text)
                    .with_path_context("write output", path)?;
                Ok(None)
            }
            None => Ok(Some(text)),
        }
    }

    fn ensure_exists(&self, path: &Path) -> ApplicationResult<()> {
        if self.fs.exists(path) {
            Ok(())
        } else {
            Err(ApplicationError::NotFound(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyStrategy;
    use crate::domain::Identifiable;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryFs {
        files: Mutex<HashMap<PathBuf, String>>,
    }

    impl MemoryFs {
        fn with_file(path: &str, content: &str) -> Self {
            let fs = Self::default();
            fs.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), content.to_string());
            fs
        }
    }

    impl FileSystem for MemoryFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }

        fn ensure_parent(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn sequence_settings() -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.keys.strategy = KeyStrategy::Sequence;
        Arc::new(settings)
    }

    const DOC: &str = r#"
name = "a"

[[children]]
name = "b"
id = "1"

[[children.children]]
name = "c"

[[children]]
name = "b"
id = "2"
"#;

    #[test]
    fn given_document_when_flattening_then_records_in_preorder() {
        let fs = Arc::new(MemoryFs::with_file("doc.toml", DOC));
        let service = TreeService::new(fs, sequence_settings());

        let flat = service.flatten_document(Path::new("doc.toml")).unwrap();

        let keys: Vec<&str> = flat.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["n0", "n1", "n2", "n3"]);
        assert_eq!(flat.records[2].parent_key, "n1");
        assert_eq!(flat.records[3].element.id.as_deref(), Some("2"));
    }

    #[test]
    fn given_written_records_when_unflattening_then_single_root() {
        let fs = Arc::new(MemoryFs::with_file("doc.toml", DOC));
        let service = TreeService::new(fs, sequence_settings());
        let flat = service.flatten_document(Path::new("doc.toml")).unwrap();
        service
            .render(&flat, Some(Path::new("flat.toml")))
            .unwrap();

        let roots = service.unflatten_records(Path::new("flat.toml")).unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].key(), "n0");
        assert_eq!(roots[0].count_nodes(), 4);
    }

    #[test]
    fn given_missing_file_when_loading_then_not_found() {
        let service = TreeService::new(Arc::new(MemoryFs::default()), sequence_settings());

        let err = service.load_document(Path::new("nope.toml")).unwrap_err();

        assert!(matches!(err, ApplicationError::NotFound(_)));
    }
}
