//! Command implementations.

mod activity;
mod alerts;
mod export;
mod record;
mod resolve;
mod summary;

pub use activity::ActivityCommand;
pub use alerts::AlertsCommand;
pub use export::ExportCommand;
pub use record::RecordCommand;
pub use resolve::ResolveCommand;
pub use summary::SummaryCommand;

use chrono::{DateTime, Utc};

pub(crate) fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
