pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod follow;
pub mod key;
pub mod models;
pub mod plugin;
pub mod retry;
pub mod routes;
pub mod value;

pub use errors::PersistError;
pub use follow::{follow_foreign_key, follow_optional_foreign_key, Entity, KeyLookup};
pub use key::{Key, KeyError};
pub use plugin::{Migration, PersistPlugin, PersistState};
pub use retry::RetryPolicy;
