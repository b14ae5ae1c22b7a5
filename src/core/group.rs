//! Reshaping of flat record collections.
//!
//! Records are partitioned by a key property. Each [`GroupStructure`] pulls a
//! set of properties out of the records of a partition into a named
//! sub-collection, and the remaining ("common") properties are kept once per
//! partition. Partitions keep the order in which their key value first appears.

use crate::domain::model::{GroupStructure, Record};
use crate::utils::error::GroupError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub type GroupResult<T> = std::result::Result<T, GroupError>;

/// Replacement written by [`replace_nil_prop_group_with_none`].
pub const NONE_PLACEHOLDER: &str = "none";

/// A `group_key -> lookup_key` path checked by the nil replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLookup {
    pub group_key: String,
    pub lookup_key: String,
}

impl GroupLookup {
    pub fn new(group_key: impl Into<String>, lookup_key: impl Into<String>) -> Self {
        Self {
            group_key: group_key.into(),
            lookup_key: lookup_key.into(),
        }
    }
}

impl<G: Into<String>, L: Into<String>> From<(G, L)> for GroupLookup {
    fn from((group_key, lookup_key): (G, L)) -> Self {
        Self::new(group_key, lookup_key)
    }
}

/// Deduplicate `group_data` by the value of `uniq_key`, keeping first occurrences.
/// Without a key the data is returned as is.
pub fn uniq_group_item(uniq_key: Option<&str>, group_data: Vec<Value>) -> Vec<Value> {
    let Some(uniq_key) = uniq_key else {
        return group_data;
    };

    let mut seen = HashSet::new();
    group_data
        .into_iter()
        .filter(|item| seen.insert(item.get(uniq_key).map(Value::to_string)))
        .collect()
}

/// Collapse one partition into a single record carrying the common
/// properties and a `group_name` collection of picked `group_props`.
pub fn group_object_props_by_structure(
    structure: &GroupStructure,
    records: &[Record],
) -> GroupResult<Record> {
    validate_structure("", structure, false)?;
    validate_records(None, std::slice::from_ref(structure), records)?;
    let partition: Vec<&Record> = records.iter().collect();
    Ok(fold_partition(structure, &partition, false))
}

/// Like [`group_object_props_by_structure`] but the collection holds the bare
/// value of the single grouped property.
pub fn group_object_props_by_structure_keep_only_value(
    structure: &GroupStructure,
    records: &[Record],
) -> GroupResult<Record> {
    validate_structure("", structure, true)?;
    validate_records(None, std::slice::from_ref(structure), records)?;
    let partition: Vec<&Record> = records.iter().collect();
    Ok(fold_partition(structure, &partition, true))
}

/// Apply every structure independently to the full data set and concatenate
/// the per-partition results, structure by structure.
pub fn group_objects_props_by_structures(
    key: &str,
    structures: &[GroupStructure],
    data: &[Record],
) -> GroupResult<Vec<Record>> {
    validate_input(key, structures, data, false)?;
    Ok(grouped_by_structures(key, structures, data, false))
}

/// One record per distinct key value, stripped of every grouped property.
pub fn get_common_props(
    key: &str,
    structures: &[GroupStructure],
    records: &[Record],
) -> GroupResult<Vec<Record>> {
    validate_input(key, structures, records, false)?;
    Ok(common_props(key, structures, records))
}

/// Overlay the group collections of `grouped_data` onto the matching common
/// records. When several grouped records share a key, later ones win.
pub fn combine_common_and_grouped_data(
    key: &str,
    structures: &[GroupStructure],
    common_data: &[Record],
    grouped_data: &[Record],
) -> Vec<Record> {
    let group_names: Vec<&str> = structures.iter().map(|s| s.group_name.as_str()).collect();

    common_data
        .iter()
        .map(|item| {
            let mut merged = Record::new();
            for grouped in grouped_data
                .iter()
                .filter(|g| g.get(key) == item.get(key))
            {
                merged.merge(grouped);
            }

            let mut combined = item.clone();
            combined.merge(&merged.pick(&group_names));
            combined
        })
        .collect()
}

/// Group the properties named by `structures` under their group names, one
/// output record per distinct `key` value. Empty input is returned unchanged.
pub fn group_objects_props(
    key: &str,
    structures: &[GroupStructure],
    objects: &[Record],
) -> GroupResult<Vec<Record>> {
    group_with(key, structures, objects, false)
}

/// [`group_objects_props`] collecting bare values instead of sub-records.
pub fn group_objects_props_keep_only_value(
    key: &str,
    structures: &[GroupStructure],
    objects: &[Record],
) -> GroupResult<Vec<Record>> {
    group_with(key, structures, objects, true)
}

/// [`group_objects_props`], then every group collection holding exactly one
/// item is replaced by that item.
pub fn group_objects_props_and_head_if_single(
    key: &str,
    structures: &[GroupStructure],
    objects: &[Record],
) -> GroupResult<Vec<Record>> {
    let grouped = group_objects_props(key, structures, objects)?;
    Ok(grouped
        .into_iter()
        .map(|record| head_grouped_props_if_single(structures, record))
        .collect())
}

fn head_grouped_props_if_single(structures: &[GroupStructure], mut record: Record) -> Record {
    for structure in structures {
        let head = match record.data.get_mut(&structure.group_name) {
            Some(Value::Array(items)) if items.len() == 1 => items.pop(),
            _ => None,
        };
        if let Some(head) = head {
            record.insert(structure.group_name.clone(), head);
        }
    }
    record
}

/// Write `"none"` into every `data[group_key][lookup_key]` that is null or absent.
pub fn replace_nil_prop_group_with_none(lookups: &[GroupLookup], data: &Value) -> Value {
    create_replace_nil_prop_group(&Value::String(NONE_PLACEHOLDER.to_string()), lookups, data)
}

/// Nil replacement with a caller supplied value. Accepts a single record or
/// an array of records; anything else is returned unchanged.
///
/// Only groups that are objects are touched. A group that is itself missing,
/// null or a collection is left alone.
pub fn create_replace_nil_prop_group(
    replace_value: &Value,
    lookups: &[GroupLookup],
    data: &Value,
) -> Value {
    match data {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| replace_nil_in_item(replace_value, lookups, item))
                .collect(),
        ),
        Value::Object(_) => replace_nil_in_item(replace_value, lookups, data),
        other => other.clone(),
    }
}

fn replace_nil_in_item(replace_value: &Value, lookups: &[GroupLookup], item: &Value) -> Value {
    let mut item = item.clone();
    if let Value::Object(fields) = &mut item {
        for lookup in lookups {
            if let Some(Value::Object(group)) = fields.get_mut(&lookup.group_key) {
                let is_nil = group.get(&lookup.lookup_key).map_or(true, Value::is_null);
                if is_nil {
                    group.insert(lookup.lookup_key.clone(), replace_value.clone());
                }
            }
        }
    }
    item
}

/// Partition `data` by `group_by_key`, dropping the partition labels.
pub fn group_data_by(group_by_key: &str, data: &[Record]) -> GroupResult<Vec<Vec<Record>>> {
    validate_records(Some(group_by_key), &[], data)?;
    Ok(partition_by(group_by_key, data)
        .into_iter()
        .map(|partition| partition.into_iter().cloned().collect())
        .collect())
}

fn group_with(
    key: &str,
    structures: &[GroupStructure],
    objects: &[Record],
    value_only: bool,
) -> GroupResult<Vec<Record>> {
    if objects.is_empty() {
        return Ok(objects.to_vec());
    }
    for structure in structures {
        validate_structure(key, structure, value_only)?;
    }
    let pending = pending_structures(structures, objects)?;
    validate_records(Some(key), &pending, objects)?;

    let common = common_props(key, &pending, objects);
    let grouped = grouped_by_structures(key, &pending, objects, value_only);
    tracing::debug!(
        "Grouped {} records into {} partitions over {} structures ({} already applied)",
        objects.len(),
        common.len(),
        pending.len(),
        structures.len() - pending.len()
    );
    Ok(combine_common_and_grouped_data(key, &pending, &common, &grouped))
}

/// A structure is already applied to a record when the record carries its
/// group collection and none of its group props.
fn is_applied(structure: &GroupStructure, record: &Record) -> bool {
    record.contains_key(&structure.group_name)
        && structure
            .group_props
            .iter()
            .all(|prop| !record.contains_key(prop))
}

/// Structures still to apply. A structure applied to the first record must be
/// applied to every record; such structures are skipped so that grouping
/// grouped output leaves it unchanged.
fn pending_structures(
    structures: &[GroupStructure],
    records: &[Record],
) -> GroupResult<Vec<GroupStructure>> {
    let mut pending = Vec::with_capacity(structures.len());
    for structure in structures {
        let applied_to_first = records.first().is_some_and(|r| is_applied(structure, r));
        if !applied_to_first {
            pending.push(structure.clone());
            continue;
        }
        if let Some(index) = records.iter().position(|r| !is_applied(structure, r)) {
            return Err(GroupError::MalformedRecord {
                index,
                reason: format!(
                    "group '{}' is applied to some records only",
                    structure.group_name
                ),
            });
        }
    }
    Ok(pending)
}

fn grouped_by_structures(
    key: &str,
    structures: &[GroupStructure],
    data: &[Record],
    value_only: bool,
) -> Vec<Record> {
    let partitions = partition_by(key, data);
    structures
        .iter()
        .flat_map(|structure| {
            partitions
                .iter()
                .map(move |partition| fold_partition(structure, partition, value_only))
        })
        .collect()
}

fn common_props(key: &str, structures: &[GroupStructure], records: &[Record]) -> Vec<Record> {
    let all_group_props: Vec<&str> = structures
        .iter()
        .flat_map(|s| s.group_props.iter().map(String::as_str))
        .collect();

    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.get(key).map(Value::to_string)))
        .map(|record| record.omit(&all_group_props))
        .collect()
}

fn fold_partition(structure: &GroupStructure, partition: &[&Record], value_only: bool) -> Record {
    let mut common: Option<Record> = None;
    let mut items = Vec::with_capacity(partition.len());

    for record in partition {
        let stripped = record.omit(&structure.group_props);
        match &common {
            None => common = Some(stripped),
            Some(first) if *first != stripped => {
                tracing::debug!(
                    "Common properties differ inside group '{}', keeping the first record's",
                    structure.group_name
                );
            }
            Some(_) => {}
        }

        if value_only {
            items.push(
                structure
                    .group_props
                    .first()
                    .and_then(|prop| record.get(prop))
                    .cloned()
                    .unwrap_or(Value::Null),
            );
        } else {
            items.push(record.pick(&structure.group_props).into_value());
        }
    }

    let items = if value_only {
        items
    } else {
        uniq_group_item(structure.uniq_key.as_deref(), items)
    };

    let mut result = common.unwrap_or_default();
    result.insert(structure.group_name.clone(), Value::Array(items));
    result
}

/// Records grouped by the value of `key`, in first-occurrence order.
fn partition_by<'a>(key: &str, records: &'a [Record]) -> Vec<Vec<&'a Record>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut partitions: Vec<Vec<&Record>> = Vec::new();

    for record in records {
        let label = record.get(key).unwrap_or(&Value::Null).to_string();
        match index.get(&label) {
            Some(&i) => partitions[i].push(record),
            None => {
                index.insert(label, partitions.len());
                partitions.push(vec![record]);
            }
        }
    }
    partitions
}

fn validate_input(
    key: &str,
    structures: &[GroupStructure],
    records: &[Record],
    value_only: bool,
) -> GroupResult<()> {
    for structure in structures {
        validate_structure(key, structure, value_only)?;
    }
    validate_records(Some(key), structures, records)
}

/// `key` is the partition key, or empty when grouping a single partition.
fn validate_structure(key: &str, structure: &GroupStructure, value_only: bool) -> GroupResult<()> {
    let invalid = |reason: &str| GroupError::InvalidStructure {
        group_name: structure.group_name.clone(),
        reason: reason.to_string(),
    };

    if structure.group_name.trim().is_empty() {
        return Err(invalid("group_name cannot be empty"));
    }
    if structure.group_props.is_empty() {
        return Err(invalid("group_props cannot be empty"));
    }
    if !key.is_empty() && structure.group_props.iter().any(|prop| prop == key) {
        return Err(invalid(&format!(
            "partition key '{}' cannot be a group prop",
            key
        )));
    }
    if value_only && structure.group_props.len() != 1 {
        return Err(invalid("value-only grouping needs exactly one group prop"));
    }
    if let Some(uniq_key) = &structure.uniq_key {
        if !structure.group_props.contains(uniq_key) {
            return Err(invalid(&format!(
                "uniq_key '{}' is not one of the group props",
                uniq_key
            )));
        }
    }
    Ok(())
}

fn validate_records(
    key: Option<&str>,
    structures: &[GroupStructure],
    records: &[Record],
) -> GroupResult<()> {
    for (index, record) in records.iter().enumerate() {
        if let Some(key) = key {
            if !record.contains_key(key) {
                return Err(GroupError::MalformedRecord {
                    index,
                    reason: format!("missing key property '{}'", key),
                });
            }
        }

        for structure in structures {
            if let Some(prop) = structure
                .group_props
                .iter()
                .find(|prop| !record.contains_key(prop))
            {
                return Err(GroupError::MalformedRecord {
                    index,
                    reason: format!(
                        "missing property '{}' of group '{}'",
                        prop, structure.group_name
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_uniq_group_item_without_key_is_identity() {
        let data = vec![json!({"id": 1}), json!({"id": 1})];
        assert_eq!(uniq_group_item(None, data.clone()), data);
    }

    #[test]
    fn test_uniq_group_item_keeps_first() {
        let data = vec![
            json!({"id": 1, "n": "first"}),
            json!({"id": 2}),
            json!({"id": 1, "n": "second"}),
        ];
        assert_eq!(
            uniq_group_item(Some("id"), data),
            vec![json!({"id": 1, "n": "first"}), json!({"id": 2})]
        );
    }

    #[test]
    fn test_uniq_group_item_distinguishes_number_and_string() {
        let data = vec![json!({"id": 1}), json!({"id": "1"})];
        assert_eq!(uniq_group_item(Some("id"), data).len(), 2);
    }

    #[test]
    fn test_partition_order_follows_first_occurrence() {
        let data = records(json!([
            {"k": "b", "v": 1},
            {"k": "a", "v": 2},
            {"k": "b", "v": 3}
        ]));
        let partitions = partition_by("k", &data);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].len(), 2);
        assert_eq!(partitions[0][1].get("v"), Some(&json!(3)));
        assert_eq!(partitions[1][0].get("k"), Some(&json!("a")));
    }

    #[test]
    fn test_fold_partition_keeps_first_common_props() {
        let data = records(json!([
            {"id": 1, "name": "first", "tag": "x"},
            {"id": 1, "name": "second", "tag": "y"}
        ]));
        let structure = GroupStructure::new("tags", ["tag"]);
        let result = group_object_props_by_structure(&structure, &data).unwrap();
        assert_eq!(
            result.into_value(),
            json!({"id": 1, "name": "first", "tags": [{"tag": "x"}, {"tag": "y"}]})
        );
    }

    #[test]
    fn test_empty_partition_yields_seed() {
        let structure = GroupStructure::new("tags", ["tag"]);
        let result = group_object_props_by_structure(&structure, &[]).unwrap();
        assert_eq!(result.into_value(), json!({"tags": []}));
    }

    #[test]
    fn test_validate_structure_rejects_foreign_uniq_key() {
        let structure = GroupStructure::new("tags", ["tag"]).with_uniq_key("id");
        let err = validate_structure("id", &structure, false).unwrap_err();
        assert!(matches!(err, GroupError::InvalidStructure { .. }));
    }

    #[test]
    fn test_validate_structure_value_only_needs_one_prop() {
        let structure = GroupStructure::new("pairs", ["a", "b"]);
        assert!(validate_structure("id", &structure, false).is_ok());
        assert!(validate_structure("id", &structure, true).is_err());
    }

    #[test]
    fn test_validate_structure_rejects_partition_key_prop() {
        let structure = GroupStructure::new("items", ["id", "tag"]);
        assert!(validate_structure("", &structure, false).is_ok());
        assert!(matches!(
            validate_structure("id", &structure, false),
            Err(GroupError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn test_pending_structures_skips_applied_groups() {
        let structures = [GroupStructure::new("tags", ["tag"])];
        let applied = records(json!([{"id": 1, "tags": []}, {"id": 2, "tags": []}]));
        assert!(pending_structures(&structures, &applied).unwrap().is_empty());

        let mixed = records(json!([{"id": 1, "tags": []}, {"id": 2, "tag": "x"}]));
        assert_eq!(
            pending_structures(&structures, &mixed).unwrap_err(),
            GroupError::MalformedRecord {
                index: 1,
                reason: "group 'tags' is applied to some records only".to_string()
            }
        );
    }

    #[test]
    fn test_create_replace_nil_prop_group_custom_value() {
        let data = json!({"author": {"id": null}});
        let lookups = [GroupLookup::new("author", "id")];
        assert_eq!(
            create_replace_nil_prop_group(&json!(0), &lookups, &data),
            json!({"author": {"id": 0}})
        );
    }
}
