//! # docstore-client
//!
//! Coordination layer for a remote document-store client: cached per-database
//! request channels, unit-of-work sessions, and Hi-Lo document identifier
//! generation.
//!
//! ## Core Types
//!
//! - **[`DocumentStore`]**: Long-lived coordinator owning connection and
//!   identifier-generation state; built via [`DocumentStoreBuilder`]
//! - **[`RequestChannel`]**: Transport handle to one logical database,
//!   created once per database name and cached for the store's lifetime
//! - **[`Session`]**: Short-lived unit of work bound to exactly one channel
//! - **[`HiLoKeyGenerator`]**: Identifier generation with locally cached
//!   ranges, behind the [`KeyGenerator`] contract
//! - **[`Conventions`]**: Shared, read-only naming configuration
//! - **[`Error`]**: Error type for store operations
//!
//! ## Architecture
//!
//! - **Initialization gate**: sessions, identifier generation, and the
//!   operations facade are unavailable until `initialize()` succeeds; one
//!   central guard yields the same error for every gated operation
//! - **Exactly-once channel creation**: the per-database channel cache is
//!   append-only; concurrent lookups for the same name observe one instance
//! - **Lazy singletons**: conventions, the key generator, and the operations
//!   facade are constructed on first use and cached thereafter
//! - **Fail-fast coordination**: no retries and no error wrapping; allocation
//!   and transport errors propagate unchanged
//!
//! ## Usage
//!
//! ```no_run
//! use docstore_client::DocumentStore;
//!
//! #[tokio::main]
//! async fn main() -> docstore_client::Result<()> {
//!     let store = DocumentStore::builder()
//!         .base_url("http://localhost:8080")
//!         .default_database("Northwind")
//!         .build()
//!         .initialize()?;
//!
//!     // Sessions are cheap and never cached; open one per unit of work.
//!     let session = store.open_session()?;
//!     println!("session {} bound to {}", session.id(), session.database());
//!
//!     // Identifier generation may reserve a new range from the service.
//!     let entity = serde_json::json!({ "company": "ACME" });
//!     let id = store.generate_id(&entity, Some(&"Order"), None).await?;
//!     println!("next order id: {id}");
//!
//!     // Release any reserved-but-unused identifier range at shutdown.
//!     store.finalize().await?;
//!     Ok(())
//! }
//! ```

mod channel;
mod conventions;
mod error;
mod hilo;
mod operations;
mod registry;
mod session;
mod store;

// Re-export public types
pub use channel::{ChannelCommand, RequestChannel};
pub use conventions::Conventions;
pub use error::Error;
pub use hilo::{HiLoKeyGenerator, IdRange, KeyGenerator, NamedType, RangeAllocator, TypeDescriptor};
pub use operations::Operations;
pub use session::{Session, SessionOptions};
pub use store::{DocumentStore, DocumentStoreBuilder};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
