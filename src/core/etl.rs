use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct ShaperEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ShaperEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting record shaping...");

        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.len());

        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!("Shaped into {} records", transformed.records.len());

        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
