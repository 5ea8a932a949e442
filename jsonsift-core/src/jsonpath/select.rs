//! Applies a parsed [`Path`] to a document.

use serde_json::Value;

use super::ast::{Path, Step};
use super::predicate::matches;

/// Collects every node selected by `path`, in document order.
pub fn select<'a>(path: &Path, root: &'a Value) -> Vec<&'a Value> {
    path.steps.iter().fold(vec![root], |nodes, step| {
        let mut next = Vec::with_capacity(nodes.len());
        for node in nodes {
            apply(step, node, &mut next);
        }
        next
    })
}

fn apply<'a>(step: &Step, node: &'a Value, out: &mut Vec<&'a Value>) {
    match step {
        Step::Member(name) => out.extend(node.as_object().and_then(|map| map.get(name))),
        Step::Index(index) => out.extend(node.as_array().and_then(|items| at(items, *index))),
        Step::Slice { start, end, step } => {
            if let Some(items) = node.as_array() {
                slice(items, *start, *end, step.unwrap_or(1), out);
            }
        }
        Step::Wildcard => children(node, out),
        Step::DescendantMember(name) => descend(node, &mut |value| {
            out.extend(value.as_object().and_then(|map| map.get(name)))
        }),
        Step::DescendantAll => descend(node, &mut |value| children(value, out)),
        Step::Filter(expr) => match node {
            Value::Array(items) => out.extend(items.iter().filter(|item| matches(expr, item))),
            Value::Object(map) => out.extend(map.values().filter(|item| matches(expr, item))),
            _ => {}
        },
    }
}

fn at(items: &[Value], index: i64) -> Option<&Value> {
    let resolved = if index < 0 {
        items.len().checked_sub(index.unsigned_abs() as usize)?
    } else {
        usize::try_from(index).ok()?
    };
    items.get(resolved)
}

fn children<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => out.extend(map.values()),
        Value::Array(items) => out.extend(items.iter()),
        _ => {}
    }
}

/// Visits `node` and every container below it, parents before children.
fn descend<'a, F>(node: &'a Value, visit: &mut F)
where
    F: FnMut(&'a Value),
{
    visit(node);
    match node {
        Value::Object(map) => map.values().for_each(|child| descend(child, visit)),
        Value::Array(items) => items.iter().for_each(|child| descend(child, visit)),
        _ => {}
    }
}

// Slice bounds follow Python semantics: negative indexes count from the end
// and out-of-range bounds are clamped.
fn slice<'a>(
    items: &'a [Value],
    start: Option<i64>,
    end: Option<i64>,
    step: i64,
    out: &mut Vec<&'a Value>,
) {
    let len = items.len() as i64;
    let normalize = |bound: i64| if bound < 0 { len + bound } else { bound };

    if step > 0 {
        let lower = start.map(normalize).unwrap_or(0).clamp(0, len);
        let upper = end.map(normalize).unwrap_or(len).clamp(0, len);
        let mut i = lower;
        while i < upper {
            out.push(&items[i as usize]);
            let Some(next) = i.checked_add(step) else {
                break;
            };
            i = next;
        }
    } else if step < 0 {
        let upper = start.map(normalize).unwrap_or(len - 1).clamp(-1, len - 1);
        let lower = end.map(normalize).unwrap_or(-1).clamp(-1, len - 1);
        let mut i = upper;
        while i > lower {
            out.push(&items[i as usize]);
            let Some(next) = i.checked_add(step) else {
                break;
            };
            i = next;
        }
    }
}
