use crate::config::cli::Args;
use crate::domain::JuristicId;
use crate::error::Result;
use crate::infrastructure::BrowserOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;
pub(crate) mod selectors;

pub use selectors::{ExtractionSelectors, SelectorConfig};

pub struct Config {
    pub args: Args,
    pub juristic_id: JuristicId,
    pub selectors: SelectorConfig,
}

impl Config {
    /// Validates the ID before anything else is loaded.
    pub fn new(args: Args) -> Result<Self> {
        let juristic_id = JuristicId::parse(&args.juristic_id)?;
        let selectors = SelectorConfig::load(args.selectors.as_deref())?;

        Ok(Self {
            args,
            juristic_id,
            selectors,
        })
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.args.effective_headless(),
            slow_mo: Duration::from_millis(self.args.slow_mo),
            timeout: Duration::from_millis(self.args.timeout),
            chrome_path: self.args.chrome_path.clone(),
        }
    }

    pub fn output_path(&self, default: PathBuf) -> PathBuf {
        self.args.output.clone().unwrap_or(default)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if self.args.output.is_none() && !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }
        if self.args.verbose && !self.args.debug_dir.exists() {
            std::fs::create_dir_all(&self.args.debug_dir)?;
        }

        info!("Output directories exist");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use clap::Parser;

    #[test]
    fn rejects_malformed_id_before_anything_else() {
        let args = Args::try_parse_from(["dbd-scraper", "12345"]).unwrap();
        assert!(matches!(Config::new(args), Err(ScrapeError::InvalidId(_))));
    }

    #[test]
    fn maps_flags_to_browser_options() {
        let args = Args::try_parse_from([
            "dbd-scraper",
            "0105542065502",
            "--headless",
            "--slow",
            "50",
            "--timeout",
            "2000",
        ])
        .unwrap();
        let config = Config::new(args).unwrap();
        let options = config.browser_options();
        assert!(options.headless);
        assert_eq!(options.slow_mo, Duration::from_millis(50));
        assert_eq!(options.timeout, Duration::from_secs(2));
    }

    #[test]
    fn explicit_output_overrides_default_path() {
        let args =
            Args::try_parse_from(["dbd-scraper", "0105542065502", "-o", "x/y.json"]).unwrap();
        let config = Config::new(args).unwrap();
        assert_eq!(
            config.output_path(PathBuf::from("data/0105542065502.json")),
            PathBuf::from("x/y.json")
        );
    }
}
