pub mod core;
pub mod models;
pub mod theme;
pub mod utils;
pub mod widgets;

// Re-export commonly used types
pub use crate::core::{Engine, EntrySelector, EntryStore};
pub use crate::models::{Category, Entry, Tag, WidgetConfig};
pub use crate::theme::renderer::WidgetRenderer;
pub use crate::widgets::{WidgetDescriptor, WidgetError, WidgetPool};
