pub mod app_config;
pub mod keys;
pub mod kv;

pub use app_config::Config;
pub use kv::{get_json, set_json, JsonFileStore, KeyValueStore, MemoryStore};
