pub mod toml_config;

pub use toml_config::{
    BrowserSettings, OutputConfig, SiteConfig, SjrConfig, TimeoutConfig, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT,
};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "sjr-percentile")]
#[command(about = "Look up a journal on SCImago and compute its percentile in every category")]
pub struct CliConfig {
    /// Journal name to search for
    pub query: String,

    /// Ranking year used for the category tables
    #[arg(long, default_value = "2022")]
    pub year: String,

    /// Pick the N-th search result (1-based) instead of prompting
    #[arg(long, conflicts_with = "first")]
    pub pick: Option<usize>,

    /// Take the first search result without prompting
    #[arg(long)]
    pub first: bool,

    /// Stop after printing the journal's indicators and categories
    #[arg(long)]
    pub metrics_only: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run the browser without a window (challenges cannot be solved by hand)
    #[arg(long)]
    pub headless: bool,

    /// Directory for percentiles.csv and report.json
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the config file (if any) and applies command line overrides.
    pub fn load_settings(&self) -> Result<SjrConfig> {
        let mut settings = match &self.config {
            Some(path) => SjrConfig::from_file(path)?,
            None => SjrConfig::default(),
        };

        if self.headless {
            settings.browser.headless = true;
        }
        if let Some(output) = &self.output {
            settings.output.path = Some(output.clone());
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("query", &self.query)?;
        validation::validate_year("year", &self.year)?;
        if let Some(pick) = self.pick {
            validation::validate_positive_number("pick", pick as u64, 1)?;
        }
        if let Some(config) = &self.config {
            validation::validate_path("config", config)?;
        }
        Ok(())
    }
}
