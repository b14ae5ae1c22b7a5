use clap::Parser;
use record_shaper::utils::{logger, validation::Validate};
use record_shaper::{CliConfig, LocalStorage, ShaperEngine, ShapingPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting record-shaper");
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = match cli.load().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    let pipeline = ShapingPipeline::new(LocalStorage::default(), config);
    let engine = ShaperEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Shaped records written to {}", output_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Record shaping failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    }
}
