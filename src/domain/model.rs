use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An open record: property name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Copy of this record without the named fields.
    pub fn omit<S: AsRef<str>>(&self, fields: &[S]) -> Record {
        let data = self
            .data
            .iter()
            .filter(|(k, _)| !fields.iter().any(|f| f.as_ref() == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Record { data }
    }

    /// Copy of this record holding only the named fields that are present.
    pub fn pick<S: AsRef<str>>(&self, fields: &[S]) -> Record {
        let data = fields
            .iter()
            .filter_map(|f| {
                self.data
                    .get_key_value(f.as_ref())
                    .map(|(k, v)| (k.clone(), v.clone()))
            })
            .collect();
        Record { data }
    }

    /// Shallow merge; fields of `other` overwrite fields of `self`.
    pub fn merge(&mut self, other: &Record) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(other),
        }
    }
}

/// One grouping rule: move `group_props` into a sub-collection named `group_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStructure {
    pub group_name: String,
    pub group_props: Vec<String>,
    #[serde(default)]
    pub uniq_key: Option<String>,
}

impl GroupStructure {
    pub fn new<S: Into<String>>(
        group_name: impl Into<String>,
        group_props: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            group_props: group_props.into_iter().map(Into::into).collect(),
            uniq_key: None,
        }
    }

    pub fn with_uniq_key(mut self, uniq_key: impl Into<String>) -> Self {
        self.uniq_key = Some(uniq_key.into());
        self
    }
}

/// How the grouped collections are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    #[default]
    Objects,
    Values,
    HeadIfSingle,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<Record>,
    pub document: Value,
}
