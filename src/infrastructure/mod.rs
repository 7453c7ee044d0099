pub(crate) mod browser;
mod clients;
mod storage;

pub use browser::{BrowserOptions, BrowserSession, Locator};
pub use clients::moc::MocClient;
pub use storage::fs_store::FileSystemStore;
