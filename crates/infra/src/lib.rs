//! Infrastructure layer: account directory adapters and database wiring.

pub mod db;
pub mod directory;

pub use directory::{InMemoryAccountDirectory, PostgresAccountDirectory};
