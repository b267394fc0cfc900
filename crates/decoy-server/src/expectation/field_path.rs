//! Pre-parsed accessor paths for wildcard masking.
//!
//! Optional-field accessors arrive as strings like `key.child`, `items[0].id`
//! or `["quoted key"]`. They are parsed into a step list when the expectation
//! is registered, so a malformed accessor is rejected up front instead of
//! failing silently on every match.

use serde_json::Value;

/// The wildcard written into masked leaves.
pub const MASK: &str = "*";

/// Error returned for an accessor that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid optional field accessor: {0}")]
pub struct InvalidAccessor(pub String);

/// One step of an accessor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Object key, from `.key` or `["key"]`.
    Key(String),
    /// Array index, from `[3]`.
    Index(usize),
}

/// A parsed accessor: either the whole body, or a non-empty step list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// `^` replaces the entire body with the mask.
    Whole,
    Steps(Vec<Step>),
}

impl FieldPath {
    /// Parse an accessor string.
    ///
    /// The leading dot of the first key segment is optional, so `key.child`
    /// and `.key.child` are the same path. Bare keys are limited to
    /// `[A-Za-z0-9_$]`; anything else must use the quoted form.
    pub fn parse(accessor: &str) -> Result<Self, InvalidAccessor> {
        if accessor == "^" {
            return Ok(FieldPath::Whole);
        }

        let bytes = accessor.as_bytes();
        let mut steps = Vec::new();
        let mut pos = 0;

        // First segment: bare key unless the accessor starts with '.' or '['.
        if let Some(&first) = bytes.first() {
            if first != b'.' && first != b'[' {
                pos = scan_key(accessor, 0, &mut steps)
                    .ok_or_else(|| InvalidAccessor(accessor.to_string()))?;
            }
        }

        while pos < bytes.len() {
            pos = match bytes[pos] {
                b'.' => scan_key(accessor, pos + 1, &mut steps),
                b'[' => scan_bracket(accessor, pos + 1, &mut steps),
                _ => None,
            }
            .ok_or_else(|| InvalidAccessor(accessor.to_string()))?;
        }

        if steps.is_empty() {
            return Err(InvalidAccessor(accessor.to_string()));
        }
        Ok(FieldPath::Steps(steps))
    }

    /// Overwrite the addressed leaf of `root` with the mask.
    ///
    /// Resolution is lenient: a missing intermediate, an out-of-range index
    /// or a step applied to the wrong container type leaves `root` untouched.
    /// A missing leaf key under an existing object is created. Applying the
    /// same path twice yields the same value as applying it once.
    pub fn mask(&self, root: &mut Value) {
        let steps = match self {
            FieldPath::Whole => {
                *root = Value::String(MASK.to_string());
                return;
            }
            FieldPath::Steps(steps) => steps,
        };
        let Some((last, walk)) = steps.split_last() else {
            return;
        };

        let mut cursor = root;
        for step in walk {
            cursor = match (step, cursor) {
                (Step::Key(key), Value::Object(map)) => match map.get_mut(key) {
                    Some(child) => child,
                    None => return,
                },
                (Step::Index(index), Value::Array(items)) => match items.get_mut(*index) {
                    Some(child) => child,
                    None => return,
                },
                _ => return,
            };
        }

        match (last, cursor) {
            (Step::Key(key), Value::Object(map)) => {
                map.insert(key.clone(), Value::String(MASK.to_string()));
            }
            (Step::Index(index), Value::Array(items)) => {
                if let Some(slot) = items.get_mut(*index) {
                    *slot = Value::String(MASK.to_string());
                }
            }
            _ => {}
        }
    }
}

fn is_bare_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Scan a bare key starting at `start`; push it and return the end offset.
fn scan_key(accessor: &str, start: usize, steps: &mut Vec<Step>) -> Option<usize> {
    let bytes = accessor.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_bare_key_byte(bytes[end]) {
        end += 1;
    }
    if end == start {
        return None;
    }
    steps.push(Step::Key(accessor[start..end].to_string()));
    Some(end)
}

/// Scan a bracket segment (index or quoted key) whose `[` is already consumed.
fn scan_bracket(accessor: &str, start: usize, steps: &mut Vec<Step>) -> Option<usize> {
    let bytes = accessor.as_bytes();
    match bytes.get(start) {
        Some(&quote @ (b'"' | b'\'')) => {
            let key_start = start + 1;
            let key_end = bytes[key_start..]
                .iter()
                .position(|&b| b == quote)
                .map(|offset| key_start + offset)?;
            if bytes.get(key_end + 1) != Some(&b']') {
                return None;
            }
            steps.push(Step::Key(accessor[key_start..key_end].to_string()));
            Some(key_end + 2)
        }
        Some(b) if b.is_ascii_digit() => {
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if bytes.get(end) != Some(&b']') {
                return None;
            }
            let index: usize = accessor[start..end].parse().ok()?;
            steps.push(Step::Index(index));
            Some(end + 1)
        }
        _ => None,
    }
}
