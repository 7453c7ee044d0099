use clap::{ArgGroup, Parser};
use tracing::Level;
use std::path::PathBuf;

pub const DEFAULT_SEARCH_URL: &str = "https://datawarehouse.dbd.go.th/searchJuristic";
pub const DEFAULT_API_URL: &str = "https://dataapi.moc.go.th/juristic";

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Scrape the DBD Data Warehouse by juristic ID (outputs profile and financials JSON)"
)]
#[command(group(ArgGroup::new("mode").args(["headless", "headful"])))]
pub struct Args {
    /// 13-digit juristic ID to search
    pub juristic_id: String,

    /// Run in headless mode (may be blocked by the WAF)
    #[arg(long)]
    pub headless: bool,

    /// Run in headful mode (default)
    #[arg(long)]
    pub headful: bool,

    /// Slow motion in ms before every browser interaction
    #[arg(long = "slow", default_value_t = 0)]
    pub slow_mo: u64,

    /// Verbose logging to stderr, plus debug page dumps on failure
    #[arg(short, long)]
    pub verbose: bool,

    /// Output file (defaults to <data-dir>/<ID>.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory to store output data
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for debug screenshots and HTML dumps
    #[arg(long, default_value = ".")]
    pub debug_dir: PathBuf,

    /// Default timeout for page operations, in ms
    #[arg(long, default_value_t = 15_000)]
    pub timeout: u64,

    /// Path to a Chrome/Chromium executable
    #[arg(long = "chrome", env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// JSON file overriding the built-in selector chains
    #[arg(long)]
    pub selectors: Option<PathBuf>,

    /// Search page URL
    #[arg(long, env = "DBD_SEARCH_URL", default_value = DEFAULT_SEARCH_URL)]
    pub search_url: String,

    /// Also query the open-data API and merge its fields into the profile
    #[arg(long)]
    pub api_profile: bool,

    /// Open-data API endpoint used by --api-profile
    #[arg(long, env = "DBD_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl Args {
    /// Headful unless headless was explicitly requested.
    pub fn effective_headless(&self) -> bool {
        self.headless && !self.headful
    }

    /// `info` by default, `debug` with `-v`.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_headful() {
        let args = Args::try_parse_from(["dbd-scraper", "0105542065502"]).unwrap();
        assert!(!args.effective_headless());
        assert_eq!(args.slow_mo, 0);
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert_eq!(args.timeout, 15_000);
    }

    #[test]
    fn headless_and_headful_conflict() {
        let err = Args::try_parse_from(["dbd-scraper", "0105542065502", "--headless", "--headful"]);
        assert!(err.is_err());
    }

    #[test]
    fn logs_info_by_default_and_debug_when_verbose() {
        let quiet = Args::try_parse_from(["dbd-scraper", "0105542065502"]).unwrap();
        assert_eq!(quiet.log_level(), Level::INFO);

        let verbose = Args::try_parse_from(["dbd-scraper", "0105542065502", "-v"]).unwrap();
        assert_eq!(verbose.log_level(), Level::DEBUG);
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "dbd-scraper",
            "0105542065502",
            "--headless",
            "--slow",
            "250",
            "-v",
            "-o",
            "out/x.json",
        ])
        .unwrap();
        assert!(args.effective_headless());
        assert_eq!(args.slow_mo, 250);
        assert!(args.verbose);
        assert_eq!(args.output, Some(PathBuf::from("out/x.json")));
    }
}
