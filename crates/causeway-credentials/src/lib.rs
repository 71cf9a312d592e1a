// ABOUTME: Credential storage for causeway hosts
// ABOUTME: Loads, merges, and atomically persists per-host bearer tokens

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{default_credentials_path, Credential, CredentialsDocument};
