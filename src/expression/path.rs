/// Path expressions used by parser, iterator, collector and template tokens
///
/// Grammar: `a.b.c`, `a.b[2]`, `a.b[]` (wildcard, `[*]` also accepted) with an
/// optional leading `.`. Expressions are parsed into segments and compiled to a
/// JSONPath query evaluated with `jsonpath_lib`.

use crate::error::QueryError;
use serde_json::Value;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member access
    Key(String),
    /// Array element access
    Index(usize),
    /// Broadcast the rest of the path over every element
    Wildcard,
}

/// A parsed, ready-to-evaluate path expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    raw: String,
    segments: Vec<Segment>,
    /// Full JSONPath query
    query: String,
    /// JSONPath query for the part before the first wildcard
    prefix_query: Option<String>,
}

impl PathExpr {
    /// Parse a path expression, reporting the offending path on error
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        let segments = parse_segments(raw, body)?;

        let query = to_json_path(raw, &segments)?;
        let prefix_query = match segments.iter().position(|s| *s == Segment::Wildcard) {
            Some(pos) => Some(to_json_path(raw, &segments[..pos])?),
            None => None,
        };

        Ok(Self {
            raw: raw.to_string(),
            segments,
            query,
            prefix_query,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.prefix_query.is_some()
    }

    /// Evaluate against a JSON value
    ///
    /// Returns `None` ("undefined") when a segment is missing. Wildcard paths
    /// always produce an array once the part before the wildcard exists.
    pub fn evaluate(&self, value: &Value) -> Option<Value> {
        if self.segments.is_empty() {
            return Some(value.clone());
        }

        if let Some(prefix) = &self.prefix_query {
            let base = select(value, prefix)?;
            if !matches!(base.first(), Some(Value::Array(_)) | Some(Value::Object(_))) {
                return None;
            }
            let found = select(value, &self.query)?;
            return Some(Value::Array(found.into_iter().cloned().collect()));
        }

        select(value, &self.query)?.first().map(|v| (*v).clone())
    }
}

/// Parse and evaluate in one step
pub fn query(value: &Value, path: &str) -> Result<Option<Value>, QueryError> {
    Ok(PathExpr::parse(path)?.evaluate(value))
}

fn select<'a>(value: &'a Value, query: &str) -> Option<Vec<&'a Value>> {
    match jsonpath_lib::select(value, query) {
        Ok(found) => Some(found),
        Err(e) => {
            tracing::warn!("⚠️ JSONPath evaluation failed for '{}': {:?}", query, e);
            None
        }
    }
}

fn parse_segments(raw: &str, body: &str) -> Result<Vec<Segment>, QueryError> {
    let chars: Vec<char> = body.chars().collect();
    let mut segments = Vec::new();
    // true at the start and right after a '.'
    let mut expect_key = true;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if expect_key {
                    return Err(QueryError::new(raw, "empty path segment"));
                }
                expect_key = true;
                i += 1;
            }
            '[' => {
                if expect_key && !segments.is_empty() {
                    return Err(QueryError::new(raw, "empty path segment before '['"));
                }
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| QueryError::new(raw, "unclosed '['"))?;
                let inner: String = chars[i + 1..close].iter().collect();
                segments.push(parse_bracket(raw, inner.trim())?);
                expect_key = false;
                i = close + 1;
            }
            ']' => return Err(QueryError::new(raw, "unexpected ']'")),
            _ => {
                if !expect_key {
                    return Err(QueryError::new(
                        raw,
                        format!("expected '.' or '[' at position {}", i),
                    ));
                }
                let start = i;
                while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                    i += 1;
                }
                let key: String = chars[start..i].iter().collect();
                segments.push(Segment::Key(key));
                expect_key = false;
            }
        }
    }

    if expect_key && !segments.is_empty() {
        return Err(QueryError::new(raw, "path ends with '.'"));
    }

    Ok(segments)
}

fn parse_bracket(raw: &str, inner: &str) -> Result<Segment, QueryError> {
    if inner.is_empty() || inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Ok(index) = inner.parse::<usize>() {
        return Ok(Segment::Index(index));
    }
    let quoted = (inner.starts_with('\'') && inner.ends_with('\''))
        || (inner.starts_with('"') && inner.ends_with('"'));
    if quoted && inner.len() >= 2 {
        return Ok(Segment::Key(inner[1..inner.len() - 1].to_string()));
    }
    Err(QueryError::new(raw, format!("invalid array index '{}'", inner)))
}

fn to_json_path(raw: &str, segments: &[Segment]) -> Result<String, QueryError> {
    let mut query = String::from("$");
    for segment in segments {
        match segment {
            Segment::Key(key) if !key.contains('\'') => query.push_str(&format!("['{}']", key)),
            Segment::Key(key) if !key.contains('"') => query.push_str(&format!("[\"{}\"]", key)),
            Segment::Key(key) => {
                return Err(QueryError::new(
                    raw,
                    format!("key '{}' mixes single and double quotes", key),
                ))
            }
            Segment::Index(index) => query.push_str(&format!("[{}]", index)),
            Segment::Wildcard => query.push_str("[*]"),
        }
    }
    Ok(query)
}
