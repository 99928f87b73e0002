//! Per-field text transform applied before typed parsing
//!
//! A parse rule is declarative: an optional regex, a replacement template
//! and a trim flag. When the regex matches, numbered capture groups are
//! expanded into the template (`$1`, `${1}`); when it does not match the
//! result is an empty string, never the original input. A bare `$N` ends at
//! the last digit, so `$1EUR` is group 1 followed by `EUR`.

use crate::types::{ImportError, RawRow};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Declarative per-field text transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub trim_whitespace: bool,
    pub regex: Option<String>,
    pub replacement_template: String,
}

impl ParseOptions {
    /// Rule that only trims
    pub fn trimmed() -> Self {
        Self {
            trim_whitespace: true,
            ..Default::default()
        }
    }

    /// Rule with a regex and template
    pub fn with_regex(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            trim_whitespace: false,
            regex: Some(pattern.into()),
            replacement_template: template.into(),
        }
    }
}

/// A [`ParseOptions`] with its regex compiled
#[derive(Debug, Clone)]
pub struct FieldMapper {
    regex: Option<Regex>,
    template: String,
    trim: bool,
}

impl FieldMapper {
    /// Compile a parse rule
    ///
    /// An empty pattern string counts as "no regex".
    ///
    /// # Errors
    ///
    /// Returns `ImportError::InvalidRegex` naming `field` when the pattern
    /// does not compile.
    pub fn compile(field: &str, options: &ParseOptions) -> Result<Self, ImportError> {
        let regex = match options.regex.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(
                Regex::new(pattern).map_err(|e| ImportError::invalid_regex(field, pattern, &e))?,
            ),
            _ => None,
        };

        Ok(Self {
            regex,
            template: brace_numbered_groups(&options.replacement_template),
            trim: options.trim_whitespace,
        })
    }

    /// Mapper that returns its input unchanged
    pub fn identity() -> Self {
        Self {
            regex: None,
            template: String::new(),
            trim: false,
        }
    }

    /// Transform a single raw value
    pub fn apply(&self, raw: &str) -> String {
        let mapped = match &self.regex {
            Some(regex) => match regex.captures(raw) {
                Some(captures) => {
                    let mut out = String::new();
                    captures.expand(&self.template, &mut out);
                    out
                }
                None => String::new(),
            },
            None => raw.to_string(),
        };

        if self.trim {
            mapped.trim().to_string()
        } else {
            mapped
        }
    }

    /// Read `column` from `row` and transform it
    ///
    /// A column the row does not have maps to an empty string.
    pub fn map_field(&self, row: &RawRow, column: &str) -> String {
        self.apply(row.get(column).unwrap_or_default())
    }
}

/// Rewrite bare `$N` references to `${N}`
///
/// `Captures::expand` reads the longest `[_0-9A-Za-z]` run as the group
/// name, which would turn `$1EUR` into a lookup of a group named `1EUR`.
fn brace_numbered_groups(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c != '$' {
            continue;
        }
        match chars.peek() {
            Some('$') => {
                out.push('$');
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                out.push('{');
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    out.push(d);
                    chars.next();
                }
                out.push('}');
            }
            _ => {}
        }
    }

    out
}
