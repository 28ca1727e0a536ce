//! Update evaluation against JSON documents.
//!
//! Stores call [`check_preconditions`] on the stored document, then
//! [`apply_update`] on a copy, and only persist the copy if both succeed.
//! Paths are resolved against the original document before anything is
//! written; operators then run in the order `$set`, `$inc`, `$push`, `$pull`.

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::update::{ArrayFilter, Precondition, UpdateSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Field(&'a str),
    Index(usize),
    Filtered(&'a str),
}

/// One concrete step of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    At(usize),
}

fn parse_segments(path: &str) -> Result<Vec<Segment<'_>>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidUpdate("empty field path".into()));
    }
    let segments = path
        .split('.')
        .map(|raw| {
            if raw.is_empty() {
                return Err(StoreError::InvalidUpdate(format!("empty segment in '{path}'")));
            }
            if let Some(name) = raw.strip_prefix("$[").and_then(|r| r.strip_suffix(']')) {
                if name.is_empty() {
                    return Err(StoreError::InvalidUpdate(format!(
                        "unnamed positional segment in '{path}'"
                    )));
                }
                return Ok(Segment::Filtered(name));
            }
            Ok(raw
                .parse::<usize>()
                .map_or(Segment::Field(raw), Segment::Index))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if !matches!(segments.last(), Some(Segment::Field(_))) {
        return Err(StoreError::InvalidUpdate(format!(
            "'{path}' must end in a field name"
        )));
    }
    Ok(segments)
}

/// Look up a dotted path (object keys and array indices) in a document.
#[must_use]
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |node, seg| match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn filter_matches(filter: &ArrayFilter, element: &Value) -> bool {
    filter
        .conditions
        .iter()
        .all(|(field, expected)| lookup(element, field) == Some(expected))
}

fn pull_matches(element: &Value, condition: &Value) -> bool {
    match condition {
        Value::Object(fields) => {
            element.is_object()
                && fields
                    .iter()
                    .all(|(field, expected)| lookup(element, field) == Some(expected))
        }
        other => element == other,
    }
}

fn any_element_matches(doc: &Value, field: &str, condition: &Value) -> bool {
    lookup(doc, field)
        .and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|e| pull_matches(e, condition)))
}

/// Expand `segments` into every concrete path they address in `node`.
///
/// Missing fields still resolve (so `$set` can create them); a positional
/// or index segment under a missing node resolves to nothing.
fn resolve(
    node: Option<&Value>,
    segments: &[Segment<'_>],
    filters: &[ArrayFilter],
    path: &str,
    prefix: &mut Vec<Step>,
    out: &mut Vec<Vec<Step>>,
) -> Result<(), StoreError> {
    let Some((head, rest)) = segments.split_first() else {
        out.push(prefix.clone());
        return Ok(());
    };

    match head {
        Segment::Field(key) => {
            let child = match node {
                None | Some(Value::Null) => None,
                Some(Value::Object(map)) => map.get(*key),
                Some(_) => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "'{key}' in '{path}' is not inside an object"
                    )));
                }
            };
            prefix.push(Step::Key((*key).to_string()));
            resolve(child, rest, filters, path, prefix, out)?;
            prefix.pop();
        }
        Segment::Index(idx) => match node {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                if let Some(child) = items.get(*idx) {
                    prefix.push(Step::At(*idx));
                    resolve(Some(child), rest, filters, path, prefix, out)?;
                    prefix.pop();
                }
            }
            Some(_) => {
                return Err(StoreError::InvalidUpdate(format!(
                    "index {idx} in '{path}' is not inside an array"
                )));
            }
        },
        Segment::Filtered(name) => {
            let filter = filters.iter().find(|f| f.name == *name).ok_or_else(|| {
                StoreError::InvalidUpdate(format!("no array filter named '{name}' for '{path}'"))
            })?;
            match node {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => {
                    for (idx, element) in items.iter().enumerate() {
                        if filter_matches(filter, element) {
                            prefix.push(Step::At(idx));
                            resolve(Some(element), rest, filters, path, prefix, out)?;
                            prefix.pop();
                        }
                    }
                }
                Some(_) => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "'$[{name}]' in '{path}' is not an array"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// The object holding the last step of `steps`, creating missing objects
/// along the way when `create` is set.
fn parent_mut<'v>(
    doc: &'v mut Value,
    steps: &[Step],
    create: bool,
    path: &str,
) -> Result<Option<&'v mut Map<String, Value>>, StoreError> {
    let mut node = doc;
    for step in steps {
        node = match step {
            Step::Key(key) => {
                let map = node.as_object_mut().ok_or_else(|| {
                    StoreError::InvalidUpdate(format!("'{key}' in '{path}' is not inside an object"))
                })?;
                if map.get(key).is_none_or(Value::is_null) {
                    if !create {
                        return Ok(None);
                    }
                    map.insert(key.clone(), Value::Object(Map::new()));
                }
                match map.get_mut(key) {
                    Some(child) => child,
                    None => return Ok(None),
                }
            }
            Step::At(idx) => match node.as_array_mut().and_then(|items| items.get_mut(*idx)) {
                Some(child) => child,
                None => return Ok(None),
            },
        };
    }
    node.as_object_mut().map(Some).ok_or_else(|| {
        StoreError::InvalidUpdate(format!("parent of the last field in '{path}' is not an object"))
    })
}

fn add_numbers(current: &Value, by: &Value, path: &str) -> Result<Value, StoreError> {
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        return Ok(Value::from(a.saturating_add(b)));
    }
    match (current.as_f64(), by.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::from(a + b)),
        _ => Err(StoreError::InvalidUpdate(format!(
            "cannot $inc non-numeric field '{path}'"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Set,
    Inc,
    Push,
    Pull,
}

struct Resolved<'s> {
    op: Op,
    path: &'s str,
    steps: Vec<Step>,
    value: &'s Value,
}

fn apply_one(doc: &mut Value, resolved: &Resolved<'_>) -> Result<(), StoreError> {
    let Some((Step::Key(key), parent)) = resolved.steps.split_last() else {
        return Err(StoreError::InvalidUpdate(format!(
            "'{}' must end in a field name",
            resolved.path
        )));
    };
    let path = resolved.path;
    let value = resolved.value;
    let Some(map) = parent_mut(doc, parent, resolved.op != Op::Pull, path)? else {
        return Ok(());
    };

    match resolved.op {
        Op::Set => {
            map.insert(key.clone(), value.clone());
        }
        Op::Inc => {
            let next = match map.get(key) {
                None | Some(Value::Null) => value.clone(),
                Some(current) => add_numbers(current, value, path)?,
            };
            map.insert(key.clone(), next);
        }
        Op::Push => match map.get_mut(key) {
            Some(Value::Array(items)) => items.push(value.clone()),
            None | Some(Value::Null) => {
                map.insert(key.clone(), Value::Array(vec![value.clone()]));
            }
            Some(_) => {
                return Err(StoreError::InvalidUpdate(format!(
                    "cannot $push to non-array field '{path}'"
                )));
            }
        },
        Op::Pull => match map.get_mut(key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => items.retain(|e| !pull_matches(e, value)),
            Some(_) => {
                return Err(StoreError::InvalidUpdate(format!(
                    "cannot $pull from non-array field '{path}'"
                )));
            }
        },
    }
    Ok(())
}

/// Apply every operator of `spec` to `doc` in place.
///
/// All paths, `$[name]` segments included, are resolved against the
/// document as it was before the update, so a `$set` cannot change which
/// elements a `$push` in the same update reaches. Operators then run in the
/// order `$set`, `$inc`, `$push`, `$pull`.
///
/// # Errors
///
/// Returns `StoreError::InvalidUpdate` for malformed paths, unknown array
/// filter names, or operators applied to values of the wrong type. `doc`
/// may be partially modified on error, so callers apply to a copy.
pub fn apply_update(
    doc: &mut Value,
    spec: &UpdateSpec,
    filters: &[ArrayFilter],
) -> Result<(), StoreError> {
    for (path, by) in &spec.inc {
        if !by.is_number() {
            return Err(StoreError::InvalidUpdate(format!(
                "$inc amount for '{path}' is not a number"
            )));
        }
    }

    let mut plan = Vec::new();
    for (op, entries) in [
        (Op::Set, &spec.set),
        (Op::Inc, &spec.inc),
        (Op::Push, &spec.push),
        (Op::Pull, &spec.pull),
    ] {
        for (path, value) in entries {
            let segments = parse_segments(path)?;
            let mut targets = Vec::new();
            resolve(Some(&*doc), &segments, filters, path, &mut Vec::new(), &mut targets)?;
            plan.extend(targets.into_iter().map(|steps| Resolved {
                op,
                path,
                steps,
                value,
            }));
        }
    }

    for resolved in &plan {
        apply_one(doc, resolved)?;
    }
    Ok(())
}

/// Verify every precondition against the stored document.
///
/// # Errors
///
/// Returns `StoreError::PreconditionFailed` naming the first condition that
/// does not hold.
pub fn check_preconditions(
    doc: &Value,
    preconditions: &[Precondition],
    doc_path: &str,
) -> Result<(), StoreError> {
    for precondition in preconditions {
        match precondition {
            Precondition::Below { field, limit_field } => {
                let Some(limit) = lookup(doc, limit_field).and_then(Value::as_f64) else {
                    continue;
                };
                let current = lookup(doc, field).and_then(Value::as_f64).unwrap_or(0.0);
                if current >= limit {
                    return Err(StoreError::PreconditionFailed {
                        path: doc_path.to_string(),
                        reason: format!("{field} ({current}) has reached {limit_field} ({limit})"),
                    });
                }
            }
            Precondition::ArrayContains { field, key, value } => {
                let found = lookup(doc, field)
                    .and_then(Value::as_array)
                    .is_some_and(|items| {
                        items
                            .iter()
                            .any(|e| lookup(e, key).and_then(Value::as_str) == Some(value.as_str()))
                    });
                if !found {
                    return Err(StoreError::PreconditionFailed {
                        path: doc_path.to_string(),
                        reason: format!("{field} has no element with {key} = {value}"),
                    });
                }
            }
            Precondition::ArrayMatches { field, condition } => {
                if !any_element_matches(doc, field, condition) {
                    return Err(StoreError::PreconditionFailed {
                        path: doc_path.to_string(),
                        reason: format!("{field} has no element matching {condition}"),
                    });
                }
            }
            Precondition::ArrayLacks { field, condition } => {
                if any_element_matches(doc, field, condition) {
                    return Err(StoreError::PreconditionFailed {
                        path: doc_path.to_string(),
                        reason: format!("{field} already holds an element matching {condition}"),
                    });
                }
            }
        }
    }
    Ok(())
}
