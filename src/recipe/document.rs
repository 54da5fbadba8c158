// src/recipe/document.rs

//! Minimal structured view of recipe text
//!
//! Recipes are not parsed into a full syntax tree. The document only knows
//! the ordered list of `key = "literal"` assignments and where each literal
//! sits in the text, which is enough to edit a version or a hash while
//! leaving every other byte of the file untouched.

use regex::{NoExpand, Regex};
use std::ops::Range;
use tracing::debug;

/// A `key = "literal"` assignment found in a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Attribute name, including dotted paths like `src.url`
    pub key: String,
    /// Raw literal contents, without quotes and without unescaping
    pub value: String,
    /// 1-based line of the literal
    pub line: usize,
    /// Byte range of the literal contents in the document text
    pub value_range: Range<usize>,
}

/// Where the version string of a recipe lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSite {
    /// `version = "1.0"`
    Direct { range: Range<usize> },
    /// `name = "hello-1.0"`; the range covers only the version suffix
    CompositeName { range: Range<usize> },
}

impl VersionSite {
    fn range(&self) -> Range<usize> {
        match self {
            Self::Direct { range } | Self::CompositeName { range } => range.clone(),
        }
    }
}

/// Recipe text plus the assignments found in it
#[derive(Debug, Clone)]
pub struct RecipeDocument {
    text: String,
    assignments: Vec<Assignment>,
}

impl RecipeDocument {
    /// Scan recipe text for assignments
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let assignments = scan_assignments(&text);
        Self { text, assignments }
    }

    /// The current document text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the document, returning its text
    pub fn into_text(self) -> String {
        self.text
    }

    /// All assignments, in file order
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Look up the first assignment with the given key
    pub fn get(&self, key: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.key == key)
    }

    /// Count raw occurrences of a string anywhere in the text
    pub fn count_occurrences(&self, needle: &str) -> usize {
        if needle.is_empty() {
            return 0;
        }
        self.text.matches(needle).count()
    }

    /// Find the single place the version string is declared
    ///
    /// A direct `<version_key> = "<old>"` assignment wins; otherwise a
    /// `name = "<pname>-<old>"` assignment is accepted. Either must be the
    /// only match of its kind.
    pub fn locate_version(&self, version_key: &str, old_version: &str) -> Option<VersionSite> {
        let escaped = regex::escape(old_version);
        let direct = Regex::new(&format!("^{}$", escaped)).ok()?;
        let composite = Regex::new(&format!("^[^\"]+-{}$", escaped)).ok()?;

        let direct_hits: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.key == version_key && direct.is_match(&a.value))
            .collect();
        if let [hit] = direct_hits.as_slice() {
            debug!("Version declared by '{}' on line {}", hit.key, hit.line);
            return Some(VersionSite::Direct {
                range: hit.value_range.clone(),
            });
        }

        let name_hits: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.key == "name" && composite.is_match(&a.value))
            .collect();
        if let [hit] = name_hits.as_slice() {
            debug!("Version embedded in 'name' on line {}", hit.line);
            let end = hit.value_range.end;
            return Some(VersionSite::CompositeName {
                range: end - old_version.len()..end,
            });
        }

        None
    }

    /// Replace the version at a located site
    pub fn replace_version(&mut self, site: &VersionSite, new_version: &str) {
        self.splice(site.range(), new_version);
    }

    /// Replace the `"<old>"` string literal with `"<new>"`
    ///
    /// The literal must occur exactly once; otherwise nothing is touched.
    /// Returns the number of matching literals found.
    pub fn replace_literal(&mut self, old: &str, new: &str) -> usize {
        let pattern = format!("\"{}\"", regex::escape(old));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => return 0,
        };

        let count = re.find_iter(&self.text).count();
        if count == 1 {
            let replacement = format!("\"{}\"", new);
            let text = re.replacen(&self.text, 1, NoExpand(&replacement)).into_owned();
            *self = Self::parse(text);
        } else if count > 1 {
            debug!("Literal \"{}\" occurs {} times, not replacing", old, count);
        }
        count
    }

    fn splice(&mut self, range: Range<usize>, replacement: &str) {
        let mut text = String::with_capacity(self.text.len() + replacement.len());
        text.push_str(&self.text[..range.start]);
        text.push_str(replacement);
        text.push_str(&self.text[range.end..]);
        *self = Self::parse(text);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '-' | '.')
}

/// Single pass over the text recognizing `ident = "literal"`
///
/// Comments (`# ...`, `/* ... */`) and indented strings (`'' ... ''`) are
/// skipped so their contents never produce assignments.
fn scan_assignments(text: &str) -> Vec<Assignment> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut assignments = Vec::new();
    let mut key: Option<String> = None;
    let mut saw_eq = false;
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
                key = None;
                saw_eq = false;
            }
            '/' if chars.get(i + 1).map(|&(_, c)| c) == Some('*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i].1 == '\n' {
                        line += 1;
                    }
                    if chars[i].1 == '*' && chars.get(i + 1).map(|&(_, c)| c) == Some('/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                key = None;
                saw_eq = false;
            }
            '\'' if chars.get(i + 1).map(|&(_, c)| c) == Some('\'') => {
                i += 2;
                while i < chars.len() {
                    if chars[i].1 == '\n' {
                        line += 1;
                    }
                    if chars[i].1 == '\'' && chars.get(i + 1).map(|&(_, c)| c) == Some('\'') {
                        // ''' is an escaped quote pair inside the string
                        if chars.get(i + 2).map(|&(_, c)| c) == Some('\'') {
                            i += 3;
                            continue;
                        }
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                key = None;
                saw_eq = false;
            }
            '"' => {
                let start = pos + 1;
                let start_line = line;
                i += 1;
                let mut end = text.len();
                while i < chars.len() {
                    match chars[i].1 {
                        '\\' => i += 2,
                        '"' => {
                            end = chars[i].0;
                            i += 1;
                            break;
                        }
                        '\n' => {
                            line += 1;
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }
                if let (Some(k), true) = (key.take(), saw_eq) {
                    assignments.push(Assignment {
                        key: k,
                        value: text[start..end].to_string(),
                        line: start_line,
                        value_range: start..end,
                    });
                }
                saw_eq = false;
            }
            '=' => {
                if chars.get(i + 1).map(|&(_, c)| c) == Some('=') {
                    key = None;
                    saw_eq = false;
                    i += 2;
                } else {
                    saw_eq = key.is_some();
                    i += 1;
                }
            }
            c if is_ident_start(c) => {
                let start = pos;
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                let end = chars.get(i).map_or(text.len(), |&(p, _)| p);
                if saw_eq {
                    // `src = fetchurl { ... }` is not a string assignment
                    key = None;
                    saw_eq = false;
                } else {
                    key = Some(text[start..end].to_string());
                }
            }
            _ => {
                key = None;
                saw_eq = false;
                i += 1;
            }
        }
    }

    assignments
}
