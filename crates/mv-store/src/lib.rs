pub mod retry;
pub mod store;
pub mod tables;

pub use store::{Store, StoreCredential};
