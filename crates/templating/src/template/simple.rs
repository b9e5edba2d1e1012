//! Simple template engine using format-string style substitution.
//!
//! This module provides [`SimpleEngine`], a lightweight engine that uses
//! `{variable}` syntax. It is much lighter than MiniJinja and suited to
//! templates that only substitute values.
//!
//! # Syntax
//!
//! - `{name}` - Simple variable substitution
//! - `{user.name}` - Nested property access via dot notation
//! - `{items.0}` - Array index access
//! - `{> header}` - Include another registered template by name
//! - `{{` and `}}` - Escaped braces (renders as `{` and `}`)
//!
//! Unknown variables are left in place (`{missing}`) so they show up in the
//! output instead of silently disappearing.
//!
//! Includes are resolved through the asynchronous [`TemplateLoader::load`]
//! and rendered with the same locals as the including template.
//!
//! # Limitations
//!
//! SimpleEngine intentionally does NOT support loops, conditionals or
//! filters. For these, use [`MiniJinjaEngine`](super::MiniJinjaEngine).

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use super::engine::{Capabilities, Engine};
use super::loader::TemplateLoader;
use crate::error::{Result, TemplatingError};
use crate::locals::Locals;

/// How deep `{> name}` includes may nest before rendering fails.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Syntax errors reported by [`SimpleEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimpleSyntaxError {
    /// A `{` with no matching `}`.
    #[error("unclosed variable substitution: {{{0}")]
    Unclosed(String),
    /// A `{}` with nothing to substitute.
    #[error("empty variable name in template")]
    EmptyName,
    /// Includes nested deeper than [`MAX_INCLUDE_DEPTH`].
    #[error("include of \"{0}\" exceeds the maximum depth of {1}")]
    IncludeTooDeep(String, usize),
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
    Include(String),
}

/// A lightweight template engine using format-string style substitution.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use templating::template::SimpleEngine;
/// use templating::{TemplateTarget, Templating};
///
/// # #[tokio::main]
/// # async fn main() {
/// let templating = Templating::new();
/// templating.register_engine("simple", SimpleEngine::new()).unwrap();
/// templating.register_with("status", TemplateTarget::code("Status: {status}"), 0, Some("simple"));
///
/// let output = templating.render("status", &json!({"status": "ok"})).await.unwrap();
/// assert_eq!(output, "Status: ok");
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEngine;

impl SimpleEngine {
    /// Creates a new SimpleEngine.
    pub fn new() -> Self {
        Self
    }

    /// Resolves a dotted path in a JSON value.
    ///
    /// Supports:
    /// - Simple keys: `name`
    /// - Nested objects: `user.profile.name`
    /// - Array indices: `items.0` or `items.0.name`
    fn resolve_path<'a>(locals: &'a Locals, path: &str) -> Option<&'a Value> {
        let mut parts = path.split('.');
        let mut current = locals.get(parts.next()?)?;

        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Formats a JSON value as a string for output.
    fn format_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            // For arrays and objects, use JSON representation
            Value::Array(_) | Value::Object(_) => value.to_string(),
        }
    }

    fn parse(template: &str) -> std::result::Result<Vec<Segment>, SimpleSyntaxError> {
        let mut segments = Vec::new();
        let mut text = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '{' => {
                    let mut inner = String::new();
                    let mut found_close = false;
                    for inner_ch in chars.by_ref() {
                        if inner_ch == '}' {
                            found_close = true;
                            break;
                        }
                        inner.push(inner_ch);
                    }
                    if !found_close {
                        return Err(SimpleSyntaxError::Unclosed(inner));
                    }

                    let (include, name) = match inner.trim().strip_prefix('>') {
                        Some(rest) => (true, rest.trim()),
                        None => (false, inner.trim()),
                    };
                    if name.is_empty() {
                        return Err(SimpleSyntaxError::EmptyName);
                    }

                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(if include {
                        Segment::Include(name.to_string())
                    } else {
                        Segment::Variable(name.to_string())
                    });
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                _ => text.push(ch),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(segments)
    }

    fn render_code<'a>(
        &'a self,
        code: &'a str,
        locals: &'a Locals,
        loader: &'a TemplateLoader,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let segments = Self::parse(code).map_err(TemplatingError::engine)?;
            let mut output = String::with_capacity(code.len());

            for segment in segments {
                match segment {
                    Segment::Text(text) => output.push_str(&text),
                    Segment::Variable(path) => match Self::resolve_path(locals, &path) {
                        Some(value) => output.push_str(&Self::format_value(value)),
                        None => {
                            output.push('{');
                            output.push_str(&path);
                            output.push('}');
                        }
                    },
                    Segment::Include(name) => {
                        if depth >= MAX_INCLUDE_DEPTH {
                            return Err(TemplatingError::engine(
                                SimpleSyntaxError::IncludeTooDeep(name, MAX_INCLUDE_DEPTH),
                            ));
                        }
                        let nested = loader.load(&name).await?;
                        let rendered = self.render_code(&nested, locals, loader, depth + 1).await?;
                        output.push_str(&rendered);
                    }
                }
            }

            Ok(output)
        })
    }
}

#[async_trait]
impl Engine for SimpleEngine {
    fn title(&self) -> String {
        "Simple".into()
    }

    fn description(&self) -> String {
        "Format-string style {variable} substitution.".into()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            includes: true,
            ..Capabilities::default()
        }
    }

    async fn render(&self, code: &str, locals: &Locals, loader: &TemplateLoader) -> Result<String> {
        self.render_code(code, locals, loader, 0).await
    }
}
