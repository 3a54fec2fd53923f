pub mod access;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod http;
pub mod ident;
pub mod inspector;
pub mod manager;
pub mod models;
pub mod rows;
pub mod schema;

// Re-export them for easier access from main.rs
pub use access::*;
pub use config::*;
pub use error::*;
pub use ident::*;
pub use inspector::*;
pub use manager::*;
pub use models::*;
pub use schema::*;
