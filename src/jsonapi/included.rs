use super::resource_identifier;
use serde_json::Value;
use std::collections::HashSet;

/// Trim the `included` member of a JSON:API document to what was requested.
///
/// `include` holds relationship paths such as `author` or `comments.author`.
/// With no paths the member is dropped; otherwise only resources reachable
/// through one of the paths are kept. Documents that are not objects pass
/// through unchanged.
pub fn keep_included_if_request<S: AsRef<str>>(include: &[S], document: Value) -> Value {
    let mut doc = match document {
        Value::Object(doc) => doc,
        other => return other,
    };

    if include.is_empty() {
        doc.remove("included");
        return Value::Object(doc);
    }

    let included: Vec<Value> = match doc.get("included") {
        Some(Value::Array(items)) => items.clone(),
        _ => return Value::Object(doc),
    };
    let primary: Vec<&Value> = match doc.get("data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };

    let mut wanted = HashSet::new();
    for path in include {
        let mut frontier = primary.clone();
        for segment in path.as_ref().split('.').filter(|s| !s.is_empty()) {
            let linked = linked_identifiers(&frontier, segment);
            frontier = included
                .iter()
                .filter(|r| resource_identifier(r).is_some_and(|id| linked.contains(&id)))
                .collect();
            wanted.extend(linked);
        }
    }

    let kept: Vec<Value> = included
        .into_iter()
        .filter(|r| resource_identifier(r).is_some_and(|id| wanted.contains(&id)))
        .collect();

    tracing::debug!("Keeping {} included resources for {} include paths", kept.len(), include.len());
    if kept.is_empty() {
        doc.remove("included");
    } else {
        doc.insert("included".to_string(), Value::Array(kept));
    }
    Value::Object(doc)
}

fn linked_identifiers(resources: &[&Value], relationship: &str) -> HashSet<(String, String)> {
    let mut ids = HashSet::new();
    for resource in resources {
        match resource.pointer(&format!("/relationships/{}/data", relationship)) {
            Some(Value::Array(linkage)) => ids.extend(linkage.iter().filter_map(resource_identifier)),
            Some(linkage @ Value::Object(_)) => ids.extend(resource_identifier(linkage)),
            _ => {}
        }
    }
    ids
}
