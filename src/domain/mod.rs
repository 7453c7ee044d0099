mod juristic_id;
mod record;

pub use juristic_id::JuristicId;
pub use record::{ErrorRecord, FinancialsTable, Profile, ScrapeRecord, YearFigure};
