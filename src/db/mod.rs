pub mod models;
pub mod sqlite;
pub mod store;

pub use sqlite::SqliteHistoryStore;
pub use store::{HistoryStore, JsonFileStore};
