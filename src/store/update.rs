use bson::{Bson, Document};

use super::eval::bson_equal;
use crate::errors::StoreError;

// Caps the number of fields touched per operation
const MAX_UPDATE_FIELDS: usize = 128;

/// Applies a `$set` / `$unset` update document in place.
///
/// Returns whether the document changed. On error the document may be
/// partly updated; callers apply it to a copy.
///
/// # Errors
/// Returns `StoreError::Update` for unknown operators, non-document operands,
/// or attempts to change `_id`.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, StoreError> {
    if update.is_empty() {
        return Err(StoreError::Update("empty update document".into()));
    }
    let mut modified = false;
    for (op, operand) in update {
        let Bson::Document(fields) = operand else {
            return Err(StoreError::Update(format!("{op} requires a document")));
        };
        if fields.len() > MAX_UPDATE_FIELDS {
            return Err(StoreError::Update(format!("{op} touches more than {MAX_UPDATE_FIELDS} fields")));
        }
        if fields.contains_key("_id") {
            return Err(StoreError::Update("_id is immutable".into()));
        }
        match op.as_str() {
            "$set" => {
                for (path, val) in fields {
                    modified |= set_path(doc, path, val.clone())?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    modified |= unset_path(doc, path);
                }
            }
            other => return Err(StoreError::Update(format!("unsupported operator {other}"))),
        }
    }
    Ok(modified)
}

/// Missing parents are created; a parent holding a non-document value is an
/// error rather than being overwritten.
fn set_path(doc: &mut Document, path: &str, val: Bson) -> Result<bool, StoreError> {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else { return Ok(false) };
    let mut cur = doc;
    for key in parents {
        if !cur.contains_key(*key) {
            cur.insert(*key, Bson::Document(Document::new()));
        }
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return Err(StoreError::Update(format!("cannot create {path}: {key} is not a document"))),
        }
    }
    let changed = cur.get(*last).is_none_or(|p| !bson_equal(p, &val));
    cur.insert(*last, val);
    Ok(changed)
}

fn unset_path(doc: &mut Document, path: &str) -> bool {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else { return false };
    let mut cur = doc;
    for key in parents {
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    cur.remove(*last).is_some()
}
