//! Prompt templates with named placeholders
//!
//! A template is plain text where `{name}` marks a placeholder and `{{` / `}}`
//! stand for literal braces. Three names are filled by the extractor:
//!
//! - `{context}`: the `context` entry of the run's prompt variables (empty if unset)
//! - `{schema}`: the pretty-printed JSON Schema of the run's descriptor
//! - `{content}`: the chunk's units, one per line
//!
//! Any other name is looked up in the prompt variables.

use crate::chunking::tagged_content;
use chunkwise_domain::{Chunk, SchemaDescriptor, TemplateError};
use std::collections::BTreeMap;

/// Extra values available to templates, keyed by placeholder name
pub type PromptVars = BTreeMap<String, String>;

/// Placeholder filled with the run's free-form context
pub const CONTEXT_PLACEHOLDER: &str = "context";

/// Placeholder filled with the JSON Schema
pub const SCHEMA_PLACEHOLDER: &str = "schema";

/// Placeholder filled with the chunk content
pub const CONTENT_PLACEHOLDER: &str = "content";

/// Template used when none is supplied
pub const DEFAULT_TEMPLATE: &str = r#"You are a careful analyst reviewing a batch of records.

{context}

Respond with a single JSON object that conforms to this JSON Schema:

{schema}

Records to analyze:
---
{content}
---

Return only the JSON object, with no commentary before or after it."#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse template text
    ///
    /// # Errors
    ///
    /// `TemplateError::UnbalancedBrace` for a `{` that does not open a
    /// `{name}` placeholder, or a lone `}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkwise_extractor::PromptTemplate;
    ///
    /// let template = PromptTemplate::parse("{{literal}} then {content}").unwrap();
    /// assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["content"]);
    /// ```
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    while let Some(&(_, next)) = chars.peek() {
                        if next == '}' {
                            chars.next();
                            closed = true;
                            break;
                        }
                        if !is_name_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if !closed || name.is_empty() {
                        return Err(TemplateError::UnbalancedBrace { position });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err(TemplateError::UnbalancedBrace { position }),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// The built-in template
    pub fn default_template() -> Self {
        // The built-in text is well formed; an empty template is never returned
        Self::parse(DEFAULT_TEMPLATE).unwrap_or(Self { segments: Vec::new() })
    }

    /// Placeholder names in order of appearance (repeats included)
    pub fn placeholders(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Check that every name in `required` appears in the template
    pub fn require<S: AsRef<str>>(&self, required: &[S]) -> Result<(), TemplateError> {
        for name in required {
            let name = name.as_ref();
            if !self.placeholders().any(|p| p == name) {
                return Err(TemplateError::MissingPlaceholder {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Substitute placeholders using `lookup`
    pub fn render_with<'v, F>(&self, lookup: F) -> Result<String, TemplateError>
    where
        F: Fn(&str) -> Option<&'v str>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = lookup(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                        name: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Renders the prompt for each chunk of one run
///
/// The schema text is computed once per run.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'t> {
    template: &'t PromptTemplate,
    schema_text: String,
    vars: &'t PromptVars,
    tag_units: bool,
}

impl<'t> PromptBuilder<'t> {
    /// Create a builder for one run
    pub fn new(template: &'t PromptTemplate, schema: &SchemaDescriptor, vars: &'t PromptVars) -> Self {
        let schema_text = serde_json::to_string_pretty(&schema.to_json_schema())
            .unwrap_or_else(|_| schema.to_json_schema().to_string());
        Self {
            template,
            schema_text,
            vars,
            tag_units: false,
        }
    }

    /// Prefix each unit with its `LOGID-XX` tag
    pub fn with_tagged_units(mut self, tag_units: bool) -> Self {
        self.tag_units = tag_units;
        self
    }

    /// Build the prompt for one chunk
    pub fn build(&self, chunk: &Chunk<'_>) -> Result<String, TemplateError> {
        let content = if self.tag_units {
            tagged_content(chunk)
        } else {
            chunk.joined()
        };

        self.template.render_with(|name| match name {
            CONTENT_PLACEHOLDER => Some(content.as_str()),
            SCHEMA_PLACEHOLDER => Some(self.schema_text.as_str()),
            CONTEXT_PLACEHOLDER => Some(self.vars.get(name).map(String::as_str).unwrap_or("")),
            other => self.vars.get(other).map(String::as_str),
        })
    }
}

/// Render one prompt: `template` filled from `chunk`, `schema` and `vars`
pub fn build_prompt(
    template: &PromptTemplate,
    chunk: &Chunk<'_>,
    schema: &SchemaDescriptor,
    vars: &PromptVars,
) -> Result<String, TemplateError> {
    PromptBuilder::new(template, schema, vars).build(chunk)
}
