pub mod config;
pub mod types;
pub mod widget;

pub use config::Config;
pub use types::{Author, Category, Entry, EntryCategory, EntryStatus, Tag};
pub use widget::WidgetConfig;
