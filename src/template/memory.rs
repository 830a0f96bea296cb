//! In-process template registry.

use std::collections::HashMap;

use crate::template::{CompiledTemplate, TemplateEngine, TemplateError, TemplateHandle};

/// Templates registered by id at startup. Sources are compiled on `put`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<String, TemplateHandle>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a template.
    pub fn put(mut self, id: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let id = id.into();
        let compiled = CompiledTemplate::compile(&id, source)?;
        self.templates
            .insert(id.clone(), TemplateHandle::new(id, compiled));
        Ok(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateEngine for MemoryTemplates {
    fn lookup(&self, id: &str) -> Result<TemplateHandle, TemplateError> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }
}
