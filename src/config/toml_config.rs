use crate::core::group::GroupLookup;
use crate::domain::model::{GroupMode, GroupStructure};
use crate::jsonapi::{BasicSerializer, ResourceType, SerializeOptions};
use crate::utils::error::{ErrorStyle, Result, ShaperError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaperConfig {
    pub input: InputConfig,
    pub grouping: GroupingConfig,
    pub nil_replacement: Option<NilReplacementConfig>,
    pub jsonapi: Option<JsonApiConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    /// Inferred from the file extension when absent.
    pub format: Option<InputFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    pub key: String,
    #[serde(default)]
    pub mode: GroupMode,
    pub structures: Vec<GroupStructure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NilReplacementConfig {
    pub lookups: Vec<GroupLookup>,
    /// Defaults to the string "none".
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonApiConfig {
    pub r#type: String,
    #[serde(default)]
    pub error_style: ErrorStyle,
    #[serde(default)]
    pub include: Vec<String>,
    pub extra_data: Option<Value>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub filename: Option<String>,
    pub pretty: Option<bool>,
}

impl ShaperConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShaperError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShaperError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INPUT_FILE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShaperError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.path", &self.input.path)?;
        if self.input.format.is_none() {
            validation::validate_file_extension("input.path", &self.input.path, &["json", "csv"])?;
        }

        validation::validate_non_empty_string("grouping.key", &self.grouping.key)?;
        if self.grouping.structures.is_empty() {
            return Err(ShaperError::InvalidConfigValueError {
                field: "grouping.structures".to_string(),
                value: "[]".to_string(),
                reason: "At least one group structure is required".to_string(),
            });
        }
        for structure in &self.grouping.structures {
            validation::validate_non_empty_string(
                "grouping.structures.group_name",
                &structure.group_name,
            )?;
        }

        if let Some(nil_replacement) = &self.nil_replacement {
            for lookup in &nil_replacement.lookups {
                let structure = self
                    .grouping
                    .structures
                    .iter()
                    .find(|s| s.group_name == lookup.group_key);
                let structure = validation::validate_required_field(
                    &format!("grouping.structures.{}", lookup.group_key),
                    &structure,
                )?;
                if !structure.group_props.contains(&lookup.lookup_key) {
                    return Err(ShaperError::InvalidConfigValueError {
                        field: "nil_replacement.lookups.lookup_key".to_string(),
                        value: lookup.lookup_key.clone(),
                        reason: format!("Not a group prop of '{}'", lookup.group_key),
                    });
                }
            }
        }

        if let Some(jsonapi) = &self.jsonapi {
            validation::validate_non_empty_string("jsonapi.type", &jsonapi.r#type)?;
        }

        validation::validate_path("output.path", &self.output.path)?;
        Ok(())
    }

    pub fn input_format(&self) -> InputFormat {
        self.input.format.unwrap_or_else(|| {
            match Path::new(&self.input.path)
                .extension()
                .and_then(|ext| ext.to_str())
            {
                Some("csv") => InputFormat::Csv,
                _ => InputFormat::Json,
            }
        })
    }

    pub fn output_filename(&self) -> &str {
        self.output.filename.as_deref().unwrap_or("shaped.json")
    }

    pub fn pretty_output(&self) -> bool {
        self.output.pretty.unwrap_or(true)
    }

    pub fn nil_replacement_value(&self) -> Value {
        self.nil_replacement
            .as_ref()
            .and_then(|n| n.value.clone())
            .unwrap_or_else(|| Value::String(crate::core::group::NONE_PLACEHOLDER.to_string()))
    }
}

impl JsonApiConfig {
    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            resource_type: self.r#type.clone(),
            extra_data: self.extra_data.clone(),
        }
    }

    /// Registry holding every configured resource, plus the primary type
    /// with defaults when it is not configured explicitly.
    pub fn build_serializer(&self) -> BasicSerializer {
        let mut serializer = self
            .resources
            .iter()
            .fold(BasicSerializer::new(), |s, (name, resource)| {
                s.register(name.clone(), resource.clone())
            });
        if !self.resources.contains_key(&self.r#type) {
            serializer = serializer.register(self.r#type.clone(), ResourceType::default());
        }
        serializer
    }
}

impl Validate for ShaperConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
