pub(crate) mod progress;
pub(crate) mod scraping;

pub use progress::{spinner, ProgressWriter};
pub use scraping::ScrapingService;
