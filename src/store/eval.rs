use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::errors::StoreError;

// Safety limits to bound work on hostile input
const MAX_PATH_DEPTH: usize = 32;
const MAX_NESTING: usize = 32;
const MAX_IN_SET: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Parsed form of a filter document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: FilterOp, value: Bson },
}

/// Parses a store-native filter document.
///
/// Besides the usual operators, a field mapped to an array of operator
/// documents is the conjunction of those operators, e.g.
/// `{"role": [{"$ne": "a"}, {"$ne": "b"}]}`.
///
/// # Errors
/// Returns `StoreError::Filter` for unknown operators or malformed operands.
pub fn parse_filter(doc: &Document) -> Result<Filter, StoreError> {
    parse_document(doc, 0)
}

fn parse_document(doc: &Document, depth: usize) -> Result<Filter, StoreError> {
    if depth > MAX_NESTING {
        return Err(StoreError::Filter("filter nested too deeply".into()));
    }
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        clauses.push(parse_entry(key, value, depth)?);
    }
    Ok(collapse(clauses))
}

fn collapse(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => Filter::True,
        1 => clauses.pop().unwrap_or(Filter::True),
        _ => Filter::And(clauses),
    }
}

fn parse_entry(key: &str, value: &Bson, depth: usize) -> Result<Filter, StoreError> {
    match key {
        "$and" => Ok(Filter::And(sub_filters(key, value, depth)?)),
        "$or" => Ok(Filter::Or(sub_filters(key, value, depth)?)),
        "$nor" => Ok(Filter::Not(Box::new(Filter::Or(sub_filters(key, value, depth)?)))),
        k if k.starts_with('$') => Err(StoreError::Filter(format!("unknown top-level operator {k}"))),
        path => parse_field(path, value, depth),
    }
}

fn sub_filters(key: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, StoreError> {
    let Bson::Array(items) = value else {
        return Err(StoreError::Filter(format!("{key} requires an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_document(d, depth + 1),
            _ => Err(StoreError::Filter(format!("{key} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(d: &Document) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn parse_field(path: &str, value: &Bson, depth: usize) -> Result<Filter, StoreError> {
    match value {
        Bson::Document(ops) if is_operator_doc(ops) => parse_operators(path, ops, depth),
        Bson::Array(items)
            if !items.is_empty()
                && items.iter().all(|i| matches!(i, Bson::Document(d) if is_operator_doc(d))) =>
        {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                if let Bson::Document(ops) = item {
                    parts.push(parse_operators(path, ops, depth)?);
                }
            }
            Ok(Filter::And(parts))
        }
        literal => Ok(Filter::Cmp { path: path.to_string(), op: FilterOp::Eq, value: literal.clone() }),
    }
}

fn parse_operators(path: &str, ops: &Document, depth: usize) -> Result<Filter, StoreError> {
    if depth > MAX_NESTING {
        return Err(StoreError::Filter("filter nested too deeply".into()));
    }
    let cmp = |op: FilterOp, v: &Bson| Filter::Cmp { path: path.to_string(), op, value: v.clone() };
    let mut parts = Vec::with_capacity(ops.len());
    for (op, v) in ops {
        let f = match op.as_str() {
            "$eq" => cmp(FilterOp::Eq, v),
            "$ne" => cmp(FilterOp::Ne, v),
            "$gt" => cmp(FilterOp::Gt, v),
            "$gte" => cmp(FilterOp::Gte, v),
            "$lt" => cmp(FilterOp::Lt, v),
            "$lte" => cmp(FilterOp::Lte, v),
            "$in" => Filter::In { path: path.to_string(), values: operand_set(op, v)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: operand_set(op, v)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(v) },
            "$not" => match v {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    Filter::Not(Box::new(parse_operators(path, inner, depth + 1)?))
                }
                _ => return Err(StoreError::Filter("$not requires an operator document".into())),
            },
            other => return Err(StoreError::Filter(format!("unknown operator {other}"))),
        };
        parts.push(f);
    }
    Ok(collapse(parts))
}

fn operand_set(op: &str, v: &Bson) -> Result<Vec<Bson>, StoreError> {
    match v {
        Bson::Array(items) if items.len() <= MAX_IN_SET => Ok(items.clone()),
        Bson::Array(_) => Err(StoreError::Filter(format!("{op} accepts at most {MAX_IN_SET} values"))),
        _ => Err(StoreError::Filter(format!("{op} requires an array"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => to_f64(other).is_none_or(|n| n != 0.0),
    }
}

#[must_use]
pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| values.iter().any(|x| bson_equal(v, x))),
        Filter::Nin { path, values } => get_path(doc, path).is_none_or(|v| values.iter().all(|x| !bson_equal(v, x))),
        Filter::Cmp { path, op, value } => match (get_path(doc, path), op) {
            (None, FilterOp::Ne) => true,
            (Some(v), FilterOp::Eq) => bson_equal(v, value),
            (Some(v), FilterOp::Ne) => !bson_equal(v, value),
            (Some(v), FilterOp::Gt) => bson_cmp(v, value) == Some(Ordering::Greater),
            (Some(v), FilterOp::Gte) => matches!(bson_cmp(v, value), Some(Ordering::Greater | Ordering::Equal)),
            (Some(v), FilterOp::Lt) => bson_cmp(v, value) == Some(Ordering::Less),
            (Some(v), FilterOp::Lte) => matches!(bson_cmp(v, value), Some(Ordering::Less | Ordering::Equal)),
            (None, _) => false,
        },
    }
}

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = doc.get(first);
    for (depth, part) in parts.enumerate() {
        if depth + 2 > MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Some(Bson::Document(d)) => cur = d.get(part),
            _ => return None,
        }
    }
    cur
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
pub(crate) fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(x), Bson::Int64(y)) => i64::from(*x) == *y,
        (Bson::Int64(x), Bson::Int32(y)) => *x == i64::from(*y),
        (Bson::Int32(x), Bson::Double(y)) => f64::from(*x) == *y,
        (Bson::Double(x), Bson::Int32(y)) => *x == f64::from(*y),
        (Bson::Int64(x), Bson::Double(y)) => (*x as f64) == *y,
        (Bson::Double(x), Bson::Int64(y)) => *x == (*y as f64),
        _ => a == b,
    }
}

fn to_i64(b: &Bson) -> Option<i64> {
    match b {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

/// Orders two values of comparable types; `None` when the types differ.
///
/// Integer pairs compare exactly; doubles go through `f64`.
fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(ai), Some(bi)) = (to_i64(a), to_i64(b)) {
        return Some(ai.cmp(&bi));
    }
    if let (Some(af), Some(bf)) = (to_f64(a), to_f64(b)) {
        return af.partial_cmp(&bf);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
