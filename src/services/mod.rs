// Service exports
pub mod store;

pub use store::{JsonStore, ProviderStore};
