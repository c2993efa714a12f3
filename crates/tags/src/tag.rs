use crate::error::{Result, TagError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical string form of a [`TagSet`].
///
/// Keys are sorted ascending with fixed separators, so two tag sets are equal
/// iff their lines are equal. The line is both the index lookup key and the
/// serialization key of the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Line(String);

impl Line {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line(s.to_string())
    }
}

impl From<String> for Line {
    fn from(s: String) -> Self {
        Line(s)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An unordered, unique-keyed set of `key=value` tags identifying one log
/// source.
///
/// Backed by a `BTreeMap` so canonical key ordering is structural, not a
/// post-processing step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    /// Parses a raw tag string into a tag set.
    ///
    /// Accepted forms: `k1=v1,k2=v2` and `{k1=v1,k2=v2}`. Values may be
    /// double-quoted (with `\"` escapes); whitespace around keys, values and
    /// commas is ignored. An input with no tags at all parses to an EMPTY
    /// set — emptiness is a policy decision left to the caller, not a parse
    /// error.
    pub fn parse(raw: &str) -> Result<TagSet> {
        let mut body = raw.trim();
        if let Some(stripped) = body.strip_prefix('{') {
            body = stripped
                .strip_suffix('}')
                .ok_or_else(|| TagError::UnbalancedBraces(raw.to_string()))?
                .trim();
        } else if body.ends_with('}') {
            return Err(TagError::UnbalancedBraces(raw.to_string()));
        }

        let mut tags = BTreeMap::new();
        let mut rest = body;
        loop {
            rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
            if rest.is_empty() {
                break;
            }

            let eq = match rest.find(['=', ',']) {
                Some(pos) if rest.as_bytes()[pos] == b'=' => pos,
                _ => {
                    let item = rest.split(',').next().unwrap_or(rest).trim();
                    return Err(TagError::MissingSeparator(item.to_string()));
                }
            };
            let key = rest[..eq].trim();
            if key.is_empty() {
                return Err(TagError::EmptyKey(raw.to_string()));
            }

            let after_eq = rest[eq + 1..].trim_start();
            let (value, remainder) = parse_value(after_eq, raw)?;
            if tags.insert(key.to_string(), value).is_some() {
                return Err(TagError::DuplicateKey(key.to_string()));
            }
            rest = remainder;
        }

        Ok(TagSet { tags })
    }

    /// Renders the canonical line: keys sorted ascending, `key=value` pairs
    /// joined by commas. Values needing it are re-quoted so the line parses
    /// back to an equal set.
    #[must_use]
    pub fn line(&self) -> Line {
        let mut out = String::new();
        for (i, (key, value)) in self.tags.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push('=');
            if needs_quoting(value) {
                out.push('"');
                for c in value.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            } else {
                out.push_str(value);
            }
        }
        Line(out)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line())
    }
}

/// Reads one value (bare or quoted) and returns it with the unparsed
/// remainder of the input.
fn parse_value<'a>(input: &'a str, raw: &str) -> Result<(String, &'a str)> {
    if let Some(rest) = input.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.char_indices();
        while let Some((pos, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => return Err(TagError::UnterminatedQuote(raw.to_string())),
                },
                '"' => return Ok((value, &rest[pos + 1..])),
                _ => value.push(c),
            }
        }
        Err(TagError::UnterminatedQuote(raw.to_string()))
    } else {
        let end = input.find(',').unwrap_or(input.len());
        Ok((input[..end].trim_end().to_string(), &input[end..]))
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains([',', '=', '"', '{', '}'])
}
