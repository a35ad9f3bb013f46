pub mod calendar;
pub mod categories;
pub mod engine;
pub mod query;
pub mod search;
pub mod selector;
pub mod server;
pub mod store;

pub use categories::CategoryTree;
pub use engine::Engine;
pub use query::EntryQuery;
pub use search::SearchQuery;
pub use selector::{EntrySelector, Selection};
pub use server::Server;
pub use store::EntryStore;
