//! Query filters understood by every binding

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::Document;

/// A single condition on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals the given JSON value
    Eq { field: String, value: Value },
    /// Field is `base` or `base{delimiter}{digits}`
    SlugFamily {
        field: String,
        base: String,
        delimiter: String,
    },
    /// Field holds an RFC 3339 timestamp strictly before `instant`
    Before {
        field: String,
        instant: DateTime<Utc>,
    },
}

/// Conjunction of clauses; an empty filter matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Create a filter matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter matching the document with the given id
    pub fn by_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new().eq("id", id)
    }

    /// Require `field` to equal `value`
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Require `field` to belong to the slug family of `base`
    pub fn slug_family(mut self, field: &str, base: &str, delimiter: &str) -> Self {
        self.clauses.push(Clause::SlugFamily {
            field: field.to_string(),
            base: base.to_string(),
            delimiter: delimiter.to_string(),
        });
        self
    }

    /// Require `field` to be a timestamp before `instant`
    pub fn before(mut self, field: &str, instant: DateTime<Utc>) -> Self {
        self.clauses.push(Clause::Before {
            field: field.to_string(),
            instant,
        });
        self
    }

    /// The clauses of this filter, in insertion order
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluate the filter against a document
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq { field, value } => doc.get(field) == Some(value),
            Clause::SlugFamily {
                field,
                base,
                delimiter,
            } => doc
                .get(field)
                .and_then(Value::as_str)
                .and_then(|candidate| family_suffix(candidate, base, delimiter))
                .is_some(),
            Clause::Before { field, instant } => doc
                .get(field)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .is_some_and(|at| at.with_timezone(&Utc) < *instant),
        })
    }
}

/// Position of `candidate` within the slug family of `base`
///
/// Returns `Some(0)` for the bare slug, `Some(n)` for `base{delimiter}n`, and
/// `None` when the candidate is not part of the family. Suffixes of
/// `u64::MAX` or more are treated as outside the family, so a successor
/// always exists.
pub fn family_suffix(candidate: &str, base: &str, delimiter: &str) -> Option<u64> {
    let rest = candidate.strip_prefix(base)?;
    if rest.is_empty() {
        return Some(0);
    }

    let digits = rest.strip_prefix(delimiter)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok().filter(|n| *n < u64::MAX)
}
