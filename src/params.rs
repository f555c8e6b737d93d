//! Request parameters and their log-safe rendering.
//!
//! Parameters keep the order in which names were first seen. Rendering skips
//! framework-internal names ([`SKIPPED_PARAMS`]) and replaces the value of any
//! name matched by a [`MaskRules`] term with `*`. Control characters in names
//! and values are written escaped (`\n`), so a parameter can never start a new
//! log line.

use crate::error::ParamError;

use std::collections::HashMap;

/// Parameter names that never appear in a log line.
///
/// Matching is exact and case-sensitive.
pub const SKIPPED_PARAMS: &[&str] = &[
    "authenticityToken",
    "action",
    "controller",
    "x-http-method-override",
    "body",
];

/// Ordered multi-valued parameter mapping.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(String, Vec<String>)>,
    // name -> position in `entries`
    index: HashMap<String, usize>,
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Params {}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping the position of the first occurrence of `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1.push(value),
            None => self.push_entry(name, vec![value]),
        }
    }

    /// Replaces all values of `name`, or adds it at the end.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();

        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = values,
            None => self.push_entry(name, values),
        }
    }

    fn push_entry(&mut self, name: String, values: Vec<String>) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, values));
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes `application/x-www-form-urlencoded` input (a query string or a
    /// form body) and appends every pair.
    ///
    /// Invalid percent-encoding and invalid UTF-8 are decoded lossily.
    pub fn extend_from_urlencoded(&mut self, input: &[u8]) {
        for (name, value) in url::form_urlencoded::parse(input) {
            self.append(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.append(name, value);
        }
        params
    }
}

/// Lower-cased substrings whose presence in a parameter name masks its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskRules {
    terms: Vec<String>,
}

impl MaskRules {
    /// Parses a pipe-delimited list such as `password|cvv|cardNumber`.
    ///
    /// Terms are trimmed and lower-cased; empty terms are dropped. Any input is
    /// accepted: a string without `|` is a single literal term.
    pub fn parse(list: &str) -> Self {
        let mut terms: Vec<String> = Vec::new();

        for term in list.split('|') {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }

        Self { terms }
    }

    /// Case-insensitive substring match against every term.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.terms.iter().any(|term| name.contains(term.as_str()))
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Renders `params` as tab-separated `name=value` tokens.
///
/// Single values are written as-is, multiple values as `[a, b]`, masked names
/// as `*`. The result is trimmed, so the leading tab of the first token is
/// dropped.
///
/// # Errors
///
/// Returns [`ParamError::NoValues`] if an unmasked entry has no values.
pub fn try_extract_params(params: &Params, rules: &MaskRules) -> Result<String, ParamError> {
    let mut block = String::new();

    for (name, values) in params.iter() {
        if SKIPPED_PARAMS.contains(&name) {
            continue;
        }

        block.push('\t');
        push_escaped(&mut block, name);
        block.push('=');

        if rules.matches(name) {
            block.push('*');
            continue;
        }

        match values {
            [] => {
                return Err(ParamError::NoValues {
                    name: name.to_string(),
                });
            }
            [single] => push_escaped(&mut block, single),
            [first, rest @ ..] => {
                block.push('[');
                push_escaped(&mut block, first);
                for value in rest {
                    block.push_str(", ");
                    push_escaped(&mut block, value);
                }
                block.push(']');
            }
        }
    }

    Ok(block.trim().to_string())
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
}
