use crate::config::toml_config::{InputFormat, ShaperConfig};
use crate::core::group;
use crate::core::{Pipeline, Record, Storage, TransformResult};
use crate::domain::model::GroupMode;
use crate::jsonapi::{BasicSerializer, Formatter};
use crate::utils::error::{Result, ShaperError};
use serde_json::Value;

/// Reads flat records, groups them and writes the reshaped collection,
/// optionally as a JSON:API document.
pub struct ShapingPipeline<S: Storage> {
    storage: S,
    config: ShaperConfig,
    serializer: Option<BasicSerializer>,
}

impl<S: Storage> ShapingPipeline<S> {
    pub fn new(storage: S, config: ShaperConfig) -> Self {
        let serializer = config.jsonapi.as_ref().map(|j| j.build_serializer());
        Self {
            storage,
            config,
            serializer,
        }
    }

    pub fn config(&self) -> &ShaperConfig {
        &self.config
    }

    fn group(&self, records: &[Record]) -> Result<Vec<Record>> {
        let grouping = &self.config.grouping;
        let grouped = match grouping.mode {
            GroupMode::Objects => {
                group::group_objects_props(&grouping.key, &grouping.structures, records)?
            }
            GroupMode::Values => group::group_objects_props_keep_only_value(
                &grouping.key,
                &grouping.structures,
                records,
            )?,
            GroupMode::HeadIfSingle => group::group_objects_props_and_head_if_single(
                &grouping.key,
                &grouping.structures,
                records,
            )?,
        };
        Ok(grouped)
    }
}

pub fn parse_json_records(bytes: &[u8]) -> Result<Vec<Record>> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                Record::try_from(item).map_err(|other| ShaperError::ProcessingError {
                    message: format!("Input item {} is not an object: {}", index, other),
                })
            })
            .collect(),
        Value::Object(data) => Ok(vec![Record { data }]),
        other => Err(ShaperError::ProcessingError {
            message: format!("Expected an array of objects, got {}", other),
        }),
    }
}

/// CSV cells stay strings; empty cells become null.
pub fn parse_csv_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            record.insert(header, value);
        }
        records.push(record);
    }
    Ok(records)
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ShapingPipeline<S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let path = &self.config.input.path;
        tracing::debug!("Reading input from: {}", path);
        let bytes = self.storage.read_file(path).await?;

        let records = match self.config.input_format() {
            InputFormat::Json => parse_json_records(&bytes)?,
            InputFormat::Csv => parse_csv_records(&bytes)?,
        };

        if records.is_empty() {
            tracing::warn!("Input {} contains no records", path);
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let grouped = self.group(&data)?;
        let mut value = Value::Array(grouped.into_iter().map(Record::into_value).collect());

        if let Some(nil_replacement) = &self.config.nil_replacement {
            value = group::create_replace_nil_prop_group(
                &self.config.nil_replacement_value(),
                &nil_replacement.lookups,
                &value,
            );
        }
        let records: Vec<Record> = serde_json::from_value(value.clone())?;

        let document = match (&self.config.jsonapi, &self.serializer) {
            (Some(jsonapi), Some(serializer)) => {
                let formatter = Formatter::new(jsonapi.error_style);
                formatter.serialize(
                    &jsonapi.include,
                    serializer,
                    &jsonapi.serialize_options(),
                    Ok(value),
                )?
            }
            _ => value,
        };

        Ok(TransformResult { records, document })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let filename = self.config.output_filename();
        let output_path = format!("{}/{}", self.config.output.path, filename);

        let body = if self.config.pretty_output() {
            serde_json::to_vec_pretty(&result.document)?
        } else {
            serde_json::to_vec(&result.document)?
        };

        tracing::debug!("Writing {} bytes to {}", body.len(), output_path);
        self.storage.write_file(&output_path, &body).await?;
        Ok(output_path)
    }
}
