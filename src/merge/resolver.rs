//! Placeholder scanning and in-run substitution.
//!
//! Word splits text into runs wherever formatting, spell-check state or edit
//! history changes, so a placeholder typed as `{{Name}}` can end up spread
//! over several runs. The resolver works on the concatenated text of a
//! paragraph and writes the result back into the original run boundaries:
//! the replacement goes into the run where the placeholder starts and the
//! placeholder's remaining characters are cut from the runs they spilled
//! into. Runs are never added, removed or restyled.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::TextRun;

/// A placeholder found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Field name between the delimiters
    pub name: String,
    /// Byte offset of the opening delimiter
    pub start: usize,
    /// Byte offset just past the closing delimiter
    pub end: usize,
}

/// Finds `{{Name}}` and `{[Name]}` placeholders.
#[derive(Debug, Clone)]
pub struct PlaceholderScanner {
    pattern: Regex,
}

impl PlaceholderScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\{\{([^{}]+?)\}\}|\{\[([^\[\]{}]+?)\]\}").unwrap(),
        }
    }

    /// All placeholders in `text`, left to right.
    pub fn scan(&self, text: &str) -> Vec<Placeholder> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1).or_else(|| caps.get(2))?;
                Some(Placeholder {
                    name: name.as_str().to_string(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }

    /// Check if text contains at least one placeholder.
    pub fn has_placeholder(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

impl Default for PlaceholderScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared scanner instance.
pub(crate) fn scanner() -> &'static PlaceholderScanner {
    static SCANNER: OnceLock<PlaceholderScanner> = OnceLock::new();
    SCANNER.get_or_init(PlaceholderScanner::new)
}

/// Replacement text per field name.
///
/// Only fields that should be replaced have an entry; placeholders for any
/// other name are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: HashMap<String, String>,
}

impl Substitutions {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replacement for a field.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.values.insert(name.into(), text.into());
    }

    /// Replacement for a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Check if a field has a replacement.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of replacements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no replacements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Substitutions::new();
        for (k, v) in iter {
            subs.insert(k, v);
        }
        subs
    }
}

/// Substitute placeholders in a paragraph's runs.
///
/// The result has the same length, order and styles as `runs`.
///
/// # Example
/// ```
/// use docmerge::merge::{resolve, Substitutions};
/// use docmerge::TextRun;
///
/// let runs = vec![TextRun::new("Dear {{Na"), TextRun::bold("me}}!")];
/// let values: Substitutions = [("Name", "Anna")].into_iter().collect();
///
/// let resolved = resolve(&runs, &values);
/// assert_eq!(resolved[0].text, "Dear Anna");
/// assert_eq!(resolved[1].text, "!");
/// assert!(resolved[1].style.bold);
/// ```
pub fn resolve(runs: &[TextRun], values: &Substitutions) -> Vec<TextRun> {
    let texts: Vec<&str> = runs.iter().map(|run| run.text.as_str()).collect();
    match redistribute(&texts, values) {
        Some(resolved) => runs
            .iter()
            .zip(resolved)
            .map(|(run, text)| run.with_text(text))
            .collect(),
        None => runs.to_vec(),
    }
}

/// Substitute placeholders across run texts.
///
/// Returns `None` when nothing was replaced.
pub(crate) fn redistribute(texts: &[&str], values: &Substitutions) -> Option<Vec<String>> {
    if values.is_empty() || !texts.iter().any(|t| t.contains('{')) {
        return None;
    }

    let full = texts.concat();
    let hits: Vec<(usize, usize, &str)> = scanner()
        .scan(&full)
        .into_iter()
        .filter_map(|p| values.get(&p.name).map(|text| (p.start, p.end, text)))
        .collect();
    if hits.is_empty() {
        return None;
    }

    let mut resolved = Vec::with_capacity(texts.len());
    let mut start = 0;
    for text in texts {
        let end = start + text.len();
        let mut piece = String::with_capacity(text.len());
        let mut pos = start;

        for &(hit_start, hit_end, replacement) in &hits {
            if hit_end <= start || hit_start >= end {
                continue;
            }
            if hit_start >= start {
                piece.push_str(&full[pos..hit_start]);
                piece.push_str(replacement);
            }
            pos = hit_end.min(end);
        }
        piece.push_str(&full[pos..end]);

        resolved.push(piece);
        start = end;
    }

    Some(resolved)
}
