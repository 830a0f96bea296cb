//! `${content.key}` interpolation shared by all template engines.

use std::sync::LazyLock;

use regex::Regex;

use crate::template::{Bindings, TemplateError};

/// The only variable root the decoration pipeline binds.
pub const CONTENT_ROOT: &str = "content";

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z0-9_:.-]+))?(?:\s*!\s*(?:"((?:[^"\\]|\\.)*)")?)?$"#)
        .expect("valid expression regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Variable {
        expression: String,
        root: String,
        key: Option<String>,
        default: Option<String>,
    },
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    parts: Vec<Part>,
}

impl CompiledTemplate {
    /// Parse `source`. `name` is only used in error messages.
    pub fn compile(name: &str, source: &str) -> Result<Self, TemplateError> {
        let syntax = |offset: usize, message: String| TemplateError::Syntax {
            template: name.to_string(),
            offset,
            message,
        };

        let mut parts = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("${") {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after
                .find('}')
                .ok_or_else(|| syntax(offset + open, "unterminated '${'".to_string()))?;
            let expression = after[..close].trim();

            let caps = EXPRESSION
                .captures(expression)
                .ok_or_else(|| syntax(offset + open, format!("invalid expression '{expression}'")))?;
            parts.push(Part::Variable {
                expression: expression.to_string(),
                root: caps[1].to_string(),
                key: caps.get(2).map(|m| m.as_str().to_string()),
                default: if expression.contains('!') {
                    Some(unescape(caps.get(3).map_or("", |m| m.as_str())))
                } else {
                    None
                },
            });

            let consumed = open + 2 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self { parts })
    }

    /// Render against `content.*` bindings.
    ///
    /// Unbound content keys render empty; unknown roots are an error unless a
    /// default is given.
    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Variable {
                    expression,
                    root,
                    key,
                    default,
                } => {
                    let value = match (root.as_str(), key) {
                        (CONTENT_ROOT, Some(key)) => bindings.get(key).map(String::as_str),
                        _ => None,
                    };
                    match (value, default) {
                        (Some(value), _) => out.push_str(value),
                        (None, Some(default)) => out.push_str(default),
                        (None, None) if root == CONTENT_ROOT && key.is_some() => {}
                        (None, None) => return Err(TemplateError::Undefined(expression.clone())),
                    }
                }
            }
        }
        Ok(out)
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
