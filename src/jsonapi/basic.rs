use super::{id_string, resource_identifier};
use crate::domain::ports::JsonApiSerializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How records of one resource type map onto JSON:API resource objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(default = "default_id_key")]
    pub id_key: String,
    /// Record field -> related resource type.
    #[serde(default)]
    pub relationships: BTreeMap<String, String>,
}

fn default_id_key() -> String {
    "id".to_string()
}

impl Default for ResourceType {
    fn default() -> Self {
        Self {
            id_key: default_id_key(),
            relationships: BTreeMap::new(),
        }
    }
}

impl ResourceType {
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    pub fn with_relationship(
        mut self,
        field: impl Into<String>,
        related_type: impl Into<String>,
    ) -> Self {
        self.relationships.insert(field.into(), related_type.into());
        self
    }
}

/// A small registry-based JSON:API engine.
///
/// Every field of a record becomes an attribute except the id and the
/// registered relationship fields. Related objects are written as linkage
/// plus an `included` resource; scalar relationship values are taken as ids.
/// `extra_data` is emitted as the document `meta`.
#[derive(Debug, Clone, Default)]
pub struct BasicSerializer {
    types: HashMap<String, ResourceType>,
}

impl BasicSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, resource_type: ResourceType) -> Self {
        self.types.insert(name.into(), resource_type);
        self
    }

    fn lookup(&self, name: &str) -> Result<&ResourceType, String> {
        self.types
            .get(name)
            .ok_or_else(|| format!("Type '{}' is not registered", name))
    }

    fn id_key_for(&self, name: &str) -> &str {
        self.types.get(name).map_or("id", |t| t.id_key.as_str())
    }

    fn to_resource(
        &self,
        name: &str,
        resource_type: &ResourceType,
        record: &Map<String, Value>,
        included: &mut Vec<Value>,
        seen: &mut HashSet<(String, String)>,
    ) -> Value {
        let mut attributes = Map::new();
        let mut relationships = Map::new();

        for (field, value) in record {
            if *field == resource_type.id_key {
                continue;
            }
            match resource_type.relationships.get(field) {
                Some(related) => {
                    let linkage = self.linkage(related, value, included, seen);
                    relationships.insert(field.clone(), json!({ "data": linkage }));
                }
                None => {
                    attributes.insert(field.clone(), value.clone());
                }
            }
        }

        let mut resource = Map::new();
        resource.insert("type".to_string(), Value::String(name.to_string()));
        if let Some(id) = record.get(&resource_type.id_key).and_then(id_string) {
            resource.insert("id".to_string(), Value::String(id));
        }
        resource.insert("attributes".to_string(), Value::Object(attributes));
        if !relationships.is_empty() {
            resource.insert("relationships".to_string(), Value::Object(relationships));
        }
        Value::Object(resource)
    }

    fn linkage(
        &self,
        related: &str,
        value: &Value,
        included: &mut Vec<Value>,
        seen: &mut HashSet<(String, String)>,
    ) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.linkage(related, item, included, seen))
                    .filter(|linkage| !linkage.is_null())
                    .collect(),
            ),
            Value::Object(fields) => {
                let related_type = self.types.get(related).cloned().unwrap_or_default();
                let resource = self.to_resource(related, &related_type, fields, included, seen);
                match resource_identifier(&resource) {
                    Some(identifier) => {
                        let linkage = json!({"type": identifier.0.clone(), "id": identifier.1.clone()});
                        if seen.insert(identifier) {
                            included.push(resource);
                        }
                        linkage
                    }
                    None => Value::Null,
                }
            }
            scalar => match id_string(scalar) {
                Some(id) => json!({"type": related, "id": id}),
                None => Value::Null,
            },
        }
    }

    fn to_record(&self, fallback_type: &str, resource: &Value, included: &[Value]) -> Value {
        let name = resource
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(fallback_type);
        let mut record = Map::new();

        if let Some(id) = resource.get("id") {
            record.insert(self.id_key_for(name).to_string(), id.clone());
        }
        if let Some(Value::Object(attributes)) = resource.get("attributes") {
            record.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(Value::Object(relationships)) = resource.get("relationships") {
            for (field, relationship) in relationships {
                let linkage = relationship.get("data").unwrap_or(&Value::Null);
                record.insert(field.clone(), self.resolve_linkage(linkage, included));
            }
        }
        Value::Object(record)
    }

    /// Included resources are inlined one level deep, without their own
    /// relationships, so cyclic graphs terminate.
    fn resolve_linkage(&self, linkage: &Value, included: &[Value]) -> Value {
        match linkage {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_linkage(item, included))
                    .collect(),
            ),
            Value::Object(_) => {
                let Some((name, id)) = resource_identifier(linkage) else {
                    return Value::Null;
                };
                let id_key = self.id_key_for(&name).to_string();
                let found = included
                    .iter()
                    .find(|r| resource_identifier(r).is_some_and(|i| i.0 == name && i.1 == id));
                match found {
                    Some(resource) => {
                        let mut record = Map::new();
                        record.insert(id_key, Value::String(id));
                        if let Some(Value::Object(attributes)) = resource.get("attributes") {
                            record.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
                        }
                        Value::Object(record)
                    }
                    None => json!({ id_key: id }),
                }
            }
            _ => Value::Null,
        }
    }
}

impl JsonApiSerializer for BasicSerializer {
    fn serialize(
        &self,
        resource_type: &str,
        data: &Value,
        extra_data: Option<&Value>,
    ) -> Result<Value, String> {
        let registered = self.lookup(resource_type)?;
        let mut included = Vec::new();
        let mut seen = HashSet::new();

        let primary = match data {
            Value::Object(record) => {
                self.to_resource(resource_type, registered, record, &mut included, &mut seen)
            }
            Value::Array(records) => Value::Array(
                records
                    .iter()
                    .map(|record| match record {
                        Value::Object(record) => Ok(self.to_resource(
                            resource_type,
                            registered,
                            record,
                            &mut included,
                            &mut seen,
                        )),
                        other => Err(format!("Cannot serialize {} as a resource", other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            other => return Err(format!("Cannot serialize {} as a resource", other)),
        };

        let mut document = Map::new();
        document.insert("jsonapi".to_string(), json!({"version": "1.0"}));
        document.insert("data".to_string(), primary);
        if !included.is_empty() {
            document.insert("included".to_string(), Value::Array(included));
        }
        if let Some(meta @ Value::Object(_)) = extra_data {
            document.insert("meta".to_string(), meta.clone());
        }
        Ok(Value::Object(document))
    }

    fn deserialize(&self, resource_type: &str, document: &Value) -> Result<Value, String> {
        self.lookup(resource_type)?;
        let included: &[Value] = match document.get("included") {
            Some(Value::Array(items)) => items,
            _ => &[],
        };

        match document.get("data") {
            Some(Value::Array(resources)) => Ok(Value::Array(
                resources
                    .iter()
                    .map(|r| self.to_record(resource_type, r, included))
                    .collect(),
            )),
            Some(resource @ Value::Object(_)) => Ok(self.to_record(resource_type, resource, included)),
            Some(Value::Null) => Ok(Value::Null),
            _ => Err("Document has no primary data".to_string()),
        }
    }
}
