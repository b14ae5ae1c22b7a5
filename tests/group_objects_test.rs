use anyhow::Result;
use record_shaper::core::group::{
    combine_common_and_grouped_data, get_common_props, group_object_props_by_structure_keep_only_value,
    group_objects_props_by_structures, uniq_group_item,
};
use record_shaper::{
    group_data_by, group_object_props_by_structure, group_objects_props,
    group_objects_props_and_head_if_single, group_objects_props_keep_only_value,
    replace_nil_prop_group_with_none, GroupError, GroupLookup, GroupStructure, Record,
};
use serde_json::{json, Value};

fn records(value: Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
}

fn values(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Record::into_value).collect())
}

fn book_rows() -> Vec<Record> {
    records(json!([
        {"id": 1, "title": "Dune", "author": "Herbert", "tag": "scifi"},
        {"id": 1, "title": "Dune", "author": "Herbert", "tag": "classic"},
        {"id": 2, "title": "Emma", "author": "Austen", "tag": "romance"},
        {"id": 1, "title": "Dune", "author": "Herbert", "tag": "scifi"}
    ]))
}

#[test]
fn test_group_objects_props_dedups_by_uniq_key() -> Result<()> {
    let structures = [GroupStructure::new("tags", ["tag"]).with_uniq_key("tag")];
    let data = records(json!([
        {"id": 1, "name": "a", "tag": "x"},
        {"id": 1, "name": "a", "tag": "x"},
        {"id": 2, "name": "b", "tag": "y"}
    ]));

    let grouped = group_objects_props("id", &structures, &data)?;

    assert_eq!(
        values(grouped),
        json!([
            {"id": 1, "name": "a", "tags": [{"tag": "x"}]},
            {"id": 2, "name": "b", "tags": [{"tag": "y"}]}
        ])
    );
    Ok(())
}

#[test]
fn test_group_objects_props_without_uniq_key_keeps_duplicates() -> Result<()> {
    let structures = [GroupStructure::new("tags", ["tag"])];
    let grouped = group_objects_props("id", &structures, &book_rows())?;

    assert_eq!(grouped.len(), 2);
    assert_eq!(
        grouped[0].get("tags"),
        Some(&json!([{"tag": "scifi"}, {"tag": "classic"}, {"tag": "scifi"}]))
    );
    for record in &grouped {
        let mut keys: Vec<&str> = record.data.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["author", "id", "tags", "title"]);
    }
    Ok(())
}

#[test]
fn test_group_objects_props_multiple_structures() -> Result<()> {
    let structures = [
        GroupStructure::new("tags", ["tag"]).with_uniq_key("tag"),
        GroupStructure::new("authors", ["author"]).with_uniq_key("author"),
    ];
    let grouped = group_objects_props("id", &structures, &book_rows())?;

    assert_eq!(
        values(grouped),
        json!([
            {
                "id": 1,
                "title": "Dune",
                "tags": [{"tag": "scifi"}, {"tag": "classic"}],
                "authors": [{"author": "Herbert"}]
            },
            {
                "id": 2,
                "title": "Emma",
                "tags": [{"tag": "romance"}],
                "authors": [{"author": "Austen"}]
            }
        ])
    );
    Ok(())
}

#[test]
fn test_group_objects_props_multi_property_group() -> Result<()> {
    let structures = [GroupStructure::new("lines", ["sku", "qty"]).with_uniq_key("sku")];
    let data = records(json!([
        {"order": "A", "sku": "s1", "qty": 1},
        {"order": "A", "sku": "s2", "qty": 3},
        {"order": "A", "sku": "s1", "qty": 9}
    ]));

    let grouped = group_objects_props("order", &structures, &data)?;

    assert_eq!(
        values(grouped),
        json!([{"order": "A", "lines": [{"sku": "s1", "qty": 1}, {"sku": "s2", "qty": 3}]}])
    );
    Ok(())
}

#[test]
fn test_empty_input_is_returned_unchanged() -> Result<()> {
    let structures = [GroupStructure::new("tags", ["tag"])];
    assert!(group_objects_props("id", &structures, &[])?.is_empty());
    assert!(group_objects_props_keep_only_value("id", &structures, &[])?.is_empty());
    assert!(group_objects_props_and_head_if_single("id", &structures, &[])?.is_empty());
    Ok(())
}

#[test]
fn test_regrouping_grouped_output_returns_it_unchanged() -> Result<()> {
    let structures = [
        GroupStructure::new("tags", ["tag"]).with_uniq_key("tag"),
        GroupStructure::new("writer", ["author"]),
    ];
    let grouped = group_objects_props("id", &structures, &book_rows())?;
    assert_eq!(group_objects_props("id", &structures, &grouped)?, grouped);

    let headed = group_objects_props_and_head_if_single("id", &structures, &book_rows())?;
    assert_eq!(
        group_objects_props_and_head_if_single("id", &structures, &headed)?,
        headed
    );

    let values_only = group_objects_props_keep_only_value("id", &structures[..1], &book_rows())?;
    assert_eq!(
        group_objects_props_keep_only_value("id", &structures[..1], &values_only)?,
        values_only
    );
    Ok(())
}

#[test]
fn test_regrouping_applies_only_pending_structures() -> Result<()> {
    let tags = GroupStructure::new("tags", ["tag"]).with_uniq_key("tag");
    let grouped = group_objects_props("id", std::slice::from_ref(&tags), &book_rows())?;

    let both = [tags, GroupStructure::new("writer", ["author"])];
    let regrouped = group_objects_props("id", &both, &grouped)?;
    assert_eq!(
        values(regrouped),
        json!([
            {"id": 1, "title": "Dune", "tags": [{"tag": "scifi"}, {"tag": "classic"}], "writer": [{"author": "Herbert"}]},
            {"id": 2, "title": "Emma", "tags": [{"tag": "romance"}], "writer": [{"author": "Austen"}]}
        ])
    );
    Ok(())
}

#[test]
fn test_partially_grouped_input_is_malformed() {
    let structures = [GroupStructure::new("tags", ["tag"])];
    let data = records(json!([
        {"id": 1, "tags": [{"tag": "x"}]},
        {"id": 2, "tag": "y"}
    ]));

    let err = group_objects_props("id", &structures, &data).unwrap_err();
    assert!(matches!(err, GroupError::MalformedRecord { index: 1, .. }));
}

#[test]
fn test_keep_only_value() -> Result<()> {
    let structures = [GroupStructure::new("tags", ["tag"])];
    let grouped = group_objects_props_keep_only_value("id", &structures, &book_rows())?;

    assert_eq!(
        values(grouped),
        json!([
            {"id": 1, "title": "Dune", "author": "Herbert", "tags": ["scifi", "classic", "scifi"]},
            {"id": 2, "title": "Emma", "author": "Austen", "tags": ["romance"]}
        ])
    );
    Ok(())
}

#[test]
fn test_keep_only_value_rejects_multi_property_structures() {
    let structures = [GroupStructure::new("pairs", ["tag", "author"])];
    let err = group_objects_props_keep_only_value("id", &structures, &book_rows()).unwrap_err();
    assert!(matches!(err, GroupError::InvalidStructure { .. }));
}

#[test]
fn test_head_if_single() -> Result<()> {
    let structures = [
        GroupStructure::new("tags", ["tag"]).with_uniq_key("tag"),
        GroupStructure::new("authors", ["author"]).with_uniq_key("author"),
    ];
    let grouped = group_objects_props_and_head_if_single("id", &structures, &book_rows())?;

    assert_eq!(grouped[0].get("tags"), Some(&json!([{"tag": "scifi"}, {"tag": "classic"}])));
    assert_eq!(grouped[0].get("authors"), Some(&json!({"author": "Herbert"})));
    assert_eq!(grouped[1].get("tags"), Some(&json!({"tag": "romance"})));
    Ok(())
}

#[test]
fn test_group_object_props_by_structure() -> Result<()> {
    let partition = records(json!([
        {"id": 1, "name": "a", "tag": "x"},
        {"id": 1, "name": "a", "tag": "y"},
        {"id": 1, "name": "a", "tag": "x"}
    ]));
    let structure = GroupStructure::new("tags", ["tag"]).with_uniq_key("tag");

    let grouped = group_object_props_by_structure(&structure, &partition)?;
    assert_eq!(
        grouped.into_value(),
        json!({"id": 1, "name": "a", "tags": [{"tag": "x"}, {"tag": "y"}]})
    );

    let values_only = group_object_props_by_structure_keep_only_value(
        &GroupStructure::new("tags", ["tag"]),
        &partition,
    )?;
    assert_eq!(values_only.into_value(), json!({"id": 1, "name": "a", "tags": ["x", "y", "x"]}));
    Ok(())
}

#[test]
fn test_pipeline_building_blocks() -> Result<()> {
    let structures = [
        GroupStructure::new("tags", ["tag"]),
        GroupStructure::new("authors", ["author"]),
    ];
    let data = book_rows();

    let common = get_common_props("id", &structures, &data)?;
    assert_eq!(values(common.clone()), json!([{"id": 1, "title": "Dune"}, {"id": 2, "title": "Emma"}]));

    let grouped = group_objects_props_by_structures("id", &structures, &data)?;
    // one record per partition per structure
    assert_eq!(grouped.len(), 4);
    assert!(grouped[0].contains_key("tags"));
    assert!(grouped[2].contains_key("authors"));

    let combined = combine_common_and_grouped_data("id", &structures, &common, &grouped);
    assert_eq!(combined, group_objects_props("id", &structures, &data)?);
    Ok(())
}

#[test]
fn test_overlapping_group_names_last_structure_wins() -> Result<()> {
    let structures = [
        GroupStructure::new("group", ["tag"]),
        GroupStructure::new("group", ["author"]).with_uniq_key("author"),
    ];
    let grouped = group_objects_props("id", &structures, &book_rows())?;
    assert_eq!(grouped[0].get("group"), Some(&json!([{"author": "Herbert"}])));
    Ok(())
}

#[test]
fn test_uniq_group_item() {
    let data = vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 1})];
    assert_eq!(uniq_group_item(None, data.clone()), data);
    assert_eq!(uniq_group_item(Some("id"), data), vec![json!({"id": 1}), json!({"id": 2})]);
}

#[test]
fn test_missing_key_is_malformed() {
    let structures = [GroupStructure::new("tags", ["tag"])];
    let data = records(json!([{"id": 1, "tag": "x"}, {"tag": "y"}]));

    assert_eq!(
        group_objects_props("id", &structures, &data).unwrap_err(),
        GroupError::MalformedRecord {
            index: 1,
            reason: "missing key property 'id'".to_string()
        }
    );
}

#[test]
fn test_missing_group_prop_is_malformed() {
    let structures = [GroupStructure::new("tags", ["tag"])];
    let data = records(json!([{"id": 1, "tag": "x"}, {"id": 2}]));

    let err = group_objects_props("id", &structures, &data).unwrap_err();
    assert!(matches!(err, GroupError::MalformedRecord { index: 1, .. }));
}

#[test]
fn test_invalid_structures() {
    let data = book_rows();
    for structure in [
        GroupStructure::new("", ["tag"]),
        GroupStructure::new("tags", Vec::<String>::new()),
        GroupStructure::new("tags", ["tag"]).with_uniq_key("title"),
        GroupStructure::new("items", ["id", "tag"]),
    ] {
        let err = group_objects_props("id", &[structure], &data).unwrap_err();
        assert!(matches!(err, GroupError::InvalidStructure { .. }));
    }
}

#[test]
fn test_partition_key_as_group_prop_is_invalid() {
    let structures = [GroupStructure::new("items", ["id", "tag"])];
    let err = group_objects_props("id", &structures, &book_rows()).unwrap_err();
    assert_eq!(
        err,
        GroupError::InvalidStructure {
            group_name: "items".to_string(),
            reason: "partition key 'id' cannot be a group prop".to_string()
        }
    );
    assert!(get_common_props("id", &structures, &book_rows()).is_err());
    assert!(group_objects_props_by_structures("id", &structures, &book_rows()).is_err());
}

#[test]
fn test_replace_nil_prop_group_with_none() {
    let lookups = [GroupLookup::new("a", "b")];

    assert_eq!(
        replace_nil_prop_group_with_none(&lookups, &json!({"a": {"b": null}})),
        json!({"a": {"b": "none"}})
    );
    assert_eq!(
        replace_nil_prop_group_with_none(&lookups, &json!({"a": {"c": 1}})),
        json!({"a": {"c": 1, "b": "none"}})
    );
    assert_eq!(
        replace_nil_prop_group_with_none(&lookups, &json!({"a": {"b": 7}})),
        json!({"a": {"b": 7}})
    );
    assert_eq!(
        replace_nil_prop_group_with_none(
            &lookups,
            &json!([{"a": {"b": null}}, {"a": {"b": "x"}}])
        ),
        json!([{"a": {"b": "none"}}, {"a": {"b": "x"}}])
    );
    assert_eq!(replace_nil_prop_group_with_none(&lookups, &json!("text")), json!("text"));
    assert_eq!(replace_nil_prop_group_with_none(&lookups, &json!(3)), json!(3));
}

#[test]
fn test_replace_nil_leaves_collections_alone() {
    let lookups: Vec<GroupLookup> = vec![("a", "b").into()];
    let data = json!({"a": [{"b": null}]});
    assert_eq!(replace_nil_prop_group_with_none(&lookups, &data), data);
}

#[test]
fn test_group_data_by() -> Result<()> {
    let data = records(json!([
        {"type": "x", "v": 1},
        {"type": "x", "v": 2},
        {"type": "y", "v": 3}
    ]));

    let partitions: Vec<Value> = group_data_by("type", &data)?.into_iter().map(values).collect();

    assert_eq!(
        partitions,
        vec![
            json!([{"type": "x", "v": 1}, {"type": "x", "v": 2}]),
            json!([{"type": "y", "v": 3}])
        ]
    );
    Ok(())
}

#[test]
fn test_group_data_by_missing_key() {
    let data = records(json!([{"type": "x"}, {"v": 1}]));
    assert!(group_data_by("type", &data).is_err());
}
