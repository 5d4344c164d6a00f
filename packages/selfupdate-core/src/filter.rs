//! Asset-name templates
//!
//! A filter renders `{{.Key}}` placeholders into the exact file name a release
//! asset must have to be picked for this host.

use once_cell::sync::Lazy;
use regex::Regex;
use selfupdate_utils::platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const KEY_NAME: &str = "Name";
pub const KEY_OS: &str = "OS";
pub const KEY_ARCH: &str = "Arch";
pub const KEY_VERSION: &str = "Version";

pub const DEFAULT_TEMPLATE: &str = "{{.Name}}-{{.Version}}-{{.OS}}-{{.Arch}}";

static ACTION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

static KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("no value for template key {0:?}")]
    MissingKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Key(String),
}

/// Compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in ACTION_REGEX.captures_iter(source) {
            let action = caps.get_match();
            push_text(&mut segments, &source[last..action.start()], last)?;

            let inner = &caps[1];
            let key = KEY_REGEX
                .captures(inner)
                .map(|key| key[1].to_string())
                .ok_or_else(|| TemplateError::Syntax {
                    offset: action.start(),
                    message: if inner.trim().is_empty() {
                        "empty action".to_string()
                    } else {
                        format!("unsupported action {:?}, expected .Key", inner.trim())
                    },
                })?;
            segments.push(Segment::Key(key));
            last = action.end();
        }
        push_text(&mut segments, &source[last..], last)?;

        Ok(Self { segments })
    }

    /// Keys referenced by the template, in order of appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Key(key) => Some(key.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Key(key) => {
                    let value = values
                        .get(key)
                        .ok_or_else(|| TemplateError::MissingKey(key.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str, offset: usize) -> Result<(), TemplateError> {
    if let Some(open) = text.find("{{") {
        return Err(TemplateError::Syntax {
            offset: offset + open,
            message: "unclosed action".to_string(),
        });
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
    Ok(())
}

/// Template source plus user-supplied values; user values always win over
/// the host facts filled in by [`Filter::resolve_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub template: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl Filter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn compile(&self) -> Result<Template, TemplateError> {
        Template::parse(&self.template)
    }

    /// Copy of the configured values with `Name`, `OS`, `Arch` and `Version`
    /// filled in where absent. `version` is the selector being resolved
    /// (`latest` or a tag), not the version of the release found later.
    pub fn resolve_values(&self, version: &str) -> BTreeMap<String, String> {
        let mut values = self.values.clone();
        if !values.contains_key(KEY_NAME) {
            if let Some(name) = platform::program_name() {
                values.insert(KEY_NAME.to_string(), name);
            }
        }
        values
            .entry(KEY_OS.to_string())
            .or_insert_with(|| platform::os().to_string());
        values
            .entry(KEY_ARCH.to_string())
            .or_insert_with(|| platform::arch().to_string());
        values
            .entry(KEY_VERSION.to_string())
            .or_insert_with(|| version.to_string());
        values
    }

    pub fn render(&self, version: &str) -> Result<String, TemplateError> {
        self.compile()?.render(&self.resolve_values(version))
    }
}
