//! Templates loaded from a directory on disk.
//!
//! Decorator ids are relative file paths under the root. Compiled templates
//! are cached per id. Each lookup stats the file (a blocking metadata call on
//! the calling thread) and recompiles only when its modification time or
//! length changed, so edits show up without a restart.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::template::{CompiledTemplate, TemplateEngine, TemplateError, TemplateHandle};

/// File state a cached template was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
    cache: Arc<Mutex<HashMap<String, (Stamp, Arc<CompiledTemplate>)>>>,
}

impl DirectoryTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an id to a file below the root, rejecting anything that escapes it.
    fn resolve(&self, id: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(id);
        let is_plain = !id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(TemplateError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn cached(&self, id: &str, stamp: Stamp) -> Option<Arc<CompiledTemplate>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(id)
            .filter(|(cached, _)| *cached == stamp)
            .map(|(_, template)| template.clone())
    }
}

fn not_found_or_io(id: &str, path: PathBuf, e: std::io::Error) -> TemplateError {
    if e.kind() == ErrorKind::NotFound {
        TemplateError::NotFound(id.to_string())
    } else {
        TemplateError::Io { path, source: e }
    }
}

impl TemplateEngine for DirectoryTemplates {
    fn lookup(&self, id: &str) -> Result<TemplateHandle, TemplateError> {
        let path = self.resolve(id)?;
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.cache.lock().unwrap_or_else(PoisonError::into_inner).remove(id);
                return Err(not_found_or_io(id, path, e));
            }
        };
        let stamp = Stamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };
        if let Some(template) = self.cached(id, stamp) {
            return Ok(TemplateHandle::shared(id, template));
        }

        let source = std::fs::read_to_string(&path).map_err(|e| not_found_or_io(id, path.clone(), e))?;
        let compiled = Arc::new(CompiledTemplate::compile(id, &source)?);
        tracing::debug!(id, path = %path.display(), "compiled decorator template");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), (stamp, compiled.clone()));
        Ok(TemplateHandle::shared(id, compiled))
    }
}
