//! Filter fragment construction.
//!
//! Pure functions that turn a target field plus operands into store-native
//! filter and update documents. Nothing here touches a connection.

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

/// Comparison operators a `where` clause can apply to its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
}

impl CompareOp {
    /// The operator a negated clause uses instead.
    ///
    /// Range operators flip direction rather than being wrapped in `$not`,
    /// keeping the resulting filter index-friendly.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::GreaterThan => Self::LessThan,
            Self::LessThan => Self::GreaterThan,
        }
    }

    /// Applies `negate` to the operator.
    #[must_use]
    pub const fn resolve(self, negate: bool) -> Self {
        if negate { self.negated() } else { self }
    }

    /// Store-native operator tag; `None` for plain equality.
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::Equal => None,
            Self::NotEqual => Some("$ne"),
            Self::GreaterThan => Some("$gt"),
            Self::LessThan => Some("$lt"),
        }
    }
}

/// Single-field fragment for `field <op> value`.
#[must_use]
pub fn compare_fragment(field: &str, op: CompareOp, value: Bson) -> Document {
    let mut out = Document::new();
    match op.tag() {
        None => {
            out.insert(field, value);
        }
        Some(tag) => {
            let mut inner = Document::new();
            inner.insert(tag, value);
            out.insert(field, inner);
        }
    }
    out
}

/// Membership fragment for `field in values`, or `field not in values` when
/// `negate` is set.
///
/// Positive membership is a disjunction with one equality fragment per
/// candidate; an empty set yields `{"$or": []}` and matches nothing.
/// Negated membership maps the field to one `$ne` fragment per candidate,
/// read as a conjunction; an empty set yields `{}` and matches everything.
#[must_use]
pub fn membership_fragment(field: &str, values: &[Bson], negate: bool) -> Document {
    if negate {
        if values.is_empty() {
            return Document::new();
        }
        let clauses: Vec<Bson> = values.iter().map(|v| Bson::Document(doc! { "$ne": v.clone() })).collect();
        let mut out = Document::new();
        out.insert(field, clauses);
        return out;
    }
    let clauses: Vec<Bson> = values
        .iter()
        .map(|v| Bson::Document(compare_fragment(field, CompareOp::Equal, v.clone())))
        .collect();
    doc! { "$or": clauses }
}

/// Merges a new clause into an existing filter.
///
/// The first clause is kept as-is; later ones join it under `$and`. A later
/// comparison never replaces an earlier one, so a chain with several
/// clauses matches only documents satisfying all of them.
#[must_use]
pub fn conjoin(existing: Option<Document>, fragment: Document) -> Document {
    let Some(prev) = existing else { return fragment };
    let mut clauses = match prev.get("$and") {
        Some(Bson::Array(items)) if prev.len() == 1 => items.clone(),
        _ => vec![Bson::Document(prev)],
    };
    clauses.push(Bson::Document(fragment));
    doc! { "$and": clauses }
}

/// Adds `field = value` to a `$set` update, creating it when absent.
#[must_use]
pub fn set_fragment(existing: Option<Document>, field: &str, value: Bson) -> Document {
    let mut spec = existing.unwrap_or_default();
    match spec.get_mut("$set") {
        Some(Bson::Document(assignments)) => {
            assignments.insert(field, value);
        }
        _ => {
            let mut assignments = Document::new();
            assignments.insert(field, value);
            spec.insert("$set", assignments);
        }
    }
    spec
}

/// Options passed alongside an update document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Apply to every matching document instead of the first.
    pub multi: bool,
}

impl UpdateOptions {
    #[must_use]
    pub const fn multi() -> Self {
        Self { multi: true }
    }
}
