//! Object-store access
//!
//! The [`ObjectStore`] trait is the seam between the browsing core and the
//! remote store: [`SwiftClient`] implements it over HTTP, [`MemoryStore`]
//! in process for tests and local development.

pub mod client;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use client::SwiftClient;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::ObjectStore;
pub use types::{timestamp, ContainerSummary, ListEntry, Metadata, ObjectEntry, StorageSession};
