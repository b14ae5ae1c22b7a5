use crate::domain::model::{Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// A JSON:API serialization engine.
///
/// `extra_data` is engine specific (links, meta, ...). Failures are plain
/// strings; the formatter decides how they are surfaced.
#[async_trait]
pub trait JsonApiSerializer: Send + Sync {
    fn serialize(
        &self,
        resource_type: &str,
        data: &Value,
        extra_data: Option<&Value>,
    ) -> std::result::Result<Value, String>;

    fn deserialize(&self, resource_type: &str, document: &Value)
        -> std::result::Result<Value, String>;

    async fn deserialize_async(
        &self,
        resource_type: &str,
        document: &Value,
    ) -> std::result::Result<Value, String> {
        self.deserialize(resource_type, document)
    }
}
