pub mod cli;
pub mod toml_config;

pub use toml_config::ShaperConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "record-shaper")]
#[command(about = "Group flat records by key and emit nested JSON or JSON:API")]
pub struct CliConfig {
    #[arg(long, short = 'c', default_value = "shaper.toml")]
    pub config: String,

    #[arg(long, help = "Override input.path from the config file")]
    pub input: Option<String>,

    #[arg(long, help = "Override output.path from the config file")]
    pub output_dir: Option<String>,

    #[arg(long, help = "Override output.filename from the config file")]
    pub output_file: Option<String>,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Load the TOML file and apply the command line overrides.
    pub fn load(&self) -> crate::utils::error::Result<ShaperConfig> {
        let mut config = ShaperConfig::from_file(&self.config)?;
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output.path = output_dir.clone();
        }
        if let Some(output_file) = &self.output_file {
            config.output.filename = Some(output_file.clone());
        }
        Ok(config)
    }
}
