//! Document store: lifecycle, channel caching, sessions, identifier generation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;
use crate::channel::RequestChannel;
use crate::conventions::Conventions;
use crate::error::Error;
use crate::hilo::{HiLoKeyGenerator, HttpRangeAllocator, KeyGenerator, NamedType};
use crate::operations::Operations;
use crate::registry::ChannelRegistry;
use crate::session::{Session, SessionOptions};

struct StoreInner {
   registry: Arc<ChannelRegistry>,
   injected_generator: Option<Arc<dyn KeyGenerator>>,
   initialized: AtomicBool,
   key_generator: RwLock<Option<Arc<dyn KeyGenerator>>>,
   operations: RwLock<Option<Arc<Operations>>>,
}

/// Long-lived coordinator owning connection and identifier-generation state
/// for one or more logical databases behind a document-store service.
///
/// The store caches one [`RequestChannel`] per database name, mints
/// unit-of-work [`Session`]s bound to those channels, and orchestrates Hi-Lo
/// document identifier generation. Cloning is cheap: clones share all state.
/// A single instance should be created per service per application lifetime.
///
/// No session or identifier is produced before [`initialize`] succeeds, and
/// every database's channel is created exactly once and reused thereafter.
///
/// # Example
///
/// ```no_run
/// use docstore_client::DocumentStore;
///
/// # async fn example() -> docstore_client::Result<()> {
/// let store = DocumentStore::builder()
///     .base_url("http://localhost:8080")
///     .default_database("Northwind")
///     .build()
///     .initialize()?;
///
/// let session = store.open_session()?;
/// assert_eq!(session.database(), "Northwind");
///
/// let entity = serde_json::json!({ "company": "ACME" });
/// let id = store.generate_id(&entity, Some(&"Order"), None).await?;
///
/// store.finalize().await?;
/// # Ok(())
/// # }
/// ```
///
/// [`initialize`]: Self::initialize
#[derive(Clone)]
pub struct DocumentStore {
   inner: Arc<StoreInner>,
}

impl DocumentStore {
   /// Create a builder for a document store.
   pub fn builder() -> DocumentStoreBuilder {
      DocumentStoreBuilder::default()
   }

   /// The service base URL, without a trailing slash.
   pub fn base_url(&self) -> &str {
      self.inner.registry.base_url()
   }

   /// The default database name sessions and channels fall back to.
   pub fn default_database(&self) -> &str {
      self.inner.registry.default_database()
   }

   /// Initialize the store: validate the default database and install the
   /// key generator.
   ///
   /// Idempotent: the first successful call constructs the generator and
   /// flips the store to initialized; subsequent calls re-run the guard but
   /// never reconstruct the generator, and return the store unchanged.
   ///
   /// # Errors
   ///
   /// Fails with [`Error::MissingDefaultDatabase`] when no default database
   /// was configured, leaving the store uninitialized.
   pub fn initialize(&self) -> Result<DocumentStore> {
      if self.inner.registry.default_database().is_empty() {
         return Err(Error::MissingDefaultDatabase);
      }

      let mut slot = self.inner.key_generator.write();
      if slot.is_none() {
         let generator: Arc<dyn KeyGenerator> = match &self.inner.injected_generator {
            Some(generator) => Arc::clone(generator),
            None => Arc::new(HiLoKeyGenerator::new(
               self.conventions(),
               Arc::new(HttpRangeAllocator::new(Arc::clone(&self.inner.registry))),
            )),
         };
         *slot = Some(generator);
         self.inner.initialized.store(true, Ordering::Release);
         info!(
            base_url = %self.inner.registry.base_url(),
            default_database = %self.inner.registry.default_database(),
            "store initialized"
         );
      }

      Ok(self.clone())
   }

   /// Single enforcement point for the initialization gate.
   ///
   /// Every gated operation goes through here, so callers always see the
   /// same error with the same remediation hint.
   fn assert_initialized(&self) -> Result<()> {
      if self.inner.initialized.load(Ordering::Acquire) {
         Ok(())
      } else {
         Err(Error::NotInitialized)
      }
   }

   /// The store-wide conventions instance, created on first access.
   ///
   /// Safe to read before [`initialize`](Self::initialize); the same instance
   /// is shared by every channel and session created afterwards.
   pub fn conventions(&self) -> Arc<Conventions> {
      self.inner.registry.conventions()
   }

   /// Resolve the request channel for `database`, falling back to the
   /// default database, creating and caching the channel on first use.
   ///
   /// Repeated calls with the same name return the identical instance; at
   /// most one channel is ever created per distinct name for the life of the
   /// store, also under concurrent callers. Not initialization-gated.
   ///
   /// # Errors
   ///
   /// Channel construction failures from the transport layer propagate
   /// unchanged; nothing is cached in that case.
   pub fn request_channel(&self, database: Option<&str>) -> Result<Arc<RequestChannel>> {
      self.inner.registry.get_or_create(database)
   }

   /// Open a session bound to the default database.
   pub fn open_session(&self) -> Result<Session> {
      self.open_session_with(SessionOptions::default())
   }

   /// Open a session bound to the named database.
   pub fn open_session_in(&self, database: &str) -> Result<Session> {
      self.open_session_with(SessionOptions {
         database: Some(database.to_string()),
         ..Default::default()
      })
   }

   /// Open a session with explicit options.
   ///
   /// The effective database is the explicit override, else the store
   /// default; the effective channel is the options-supplied one, else the
   /// cached channel for the effective database. Every call returns a new
   /// session with a fresh unique id; the store retains no reference to it.
   ///
   /// # Errors
   ///
   /// Fails with [`Error::NotInitialized`] before a successful
   /// [`initialize`](Self::initialize).
   pub fn open_session_with(&self, options: SessionOptions) -> Result<Session> {
      self.assert_initialized()?;

      let database = options
         .database
         .unwrap_or_else(|| self.inner.registry.default_database().to_string());
      let channel = match options.request_channel {
         Some(channel) => channel,
         None => self.inner.registry.get_or_create(Some(&database))?,
      };

      let session = Session::new(database, self.clone(), channel, Uuid::new_v4());
      debug!(session = %session.id(), database = %session.database(), "opened session");
      Ok(session)
   }

   /// Generate the next document identifier for `entity`.
   ///
   /// `doc_type` supplies the document type name - a plain string, or any
   /// value implementing [`NamedType`] such as
   /// [`TypeDescriptor`](crate::TypeDescriptor); both resolve to the same
   /// effective type name. `database` overrides the store default. May
   /// suspend while the generator reserves a new identifier range.
   ///
   /// # Errors
   ///
   /// Fails with [`Error::NotInitialized`] before a successful
   /// [`initialize`](Self::initialize); allocation failures from the
   /// generator surface unchanged.
   pub async fn generate_id<E: Serialize + Sync>(
      &self,
      entity: &E,
      doc_type: Option<&dyn NamedType>,
      database: Option<&str>,
   ) -> Result<String> {
      self.assert_initialized()?;
      let generator = self
         .inner
         .key_generator
         .read()
         .as_ref()
         .map(Arc::clone)
         .ok_or(Error::NotInitialized)?;

      let entity = serde_json::to_value(entity)?;
      let type_name = doc_type.map(|doc_type| doc_type.type_name());
      generator
         .generate_document_key(&entity, type_name, database)
         .await
   }

   /// Like [`generate_id`](Self::generate_id), additionally invoking
   /// `on_done` with the outcome.
   ///
   /// The callback observes exactly the value or error the caller receives -
   /// never a success in one path and an error in the other.
   pub async fn generate_id_with_callback<E, F>(
      &self,
      entity: &E,
      doc_type: Option<&dyn NamedType>,
      database: Option<&str>,
      on_done: F,
   ) -> Result<String>
   where
      E: Serialize + Sync,
      F: FnOnce(&Result<String>),
   {
      let result = self.generate_id(entity, doc_type, database).await;
      on_done(&result);
      result
   }

   /// The maintenance-operations facade, bound to the default database.
   ///
   /// Created lazily on first access and cached for reuse.
   ///
   /// # Errors
   ///
   /// Fails with [`Error::NotInitialized`] before a successful
   /// [`initialize`](Self::initialize).
   pub fn operations(&self) -> Result<Arc<Operations>> {
      self.assert_initialized()?;

      if let Some(operations) = self.inner.operations.read().as_ref() {
         return Ok(Arc::clone(operations));
      }

      let mut slot = self.inner.operations.write();
      if let Some(operations) = slot.as_ref() {
         return Ok(Arc::clone(operations));
      }

      let channel = self.inner.registry.get_or_create(None)?;
      let operations = Arc::new(Operations::new(channel));
      *slot = Some(Arc::clone(&operations));
      Ok(operations)
   }

   /// Release the generator's reserved-but-unused identifier ranges back to
   /// the service and resolve with the store, enabling chained shutdowns.
   ///
   /// Cached channels are not destroyed; they remain usable until the store
   /// is dropped. Repeated calls re-drain - a drained generator has nothing
   /// left to return.
   ///
   /// # Errors
   ///
   /// Fails with [`Error::NotInitialized`] before a successful
   /// [`initialize`](Self::initialize) rather than dereferencing an absent
   /// generator.
   pub async fn finalize(&self) -> Result<DocumentStore> {
      self.assert_initialized()?;
      let generator = self
         .inner
         .key_generator
         .read()
         .as_ref()
         .map(Arc::clone)
         .ok_or(Error::NotInitialized)?;

      generator.return_unused_range().await?;
      debug!("unused identifier ranges returned");
      Ok(self.clone())
   }
}

impl std::fmt::Debug for DocumentStore {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("DocumentStore")
         .field("base_url", &self.inner.registry.base_url())
         .field("default_database", &self.inner.registry.default_database())
         .field("initialized", &self.inner.initialized.load(Ordering::Acquire))
         .finish_non_exhaustive()
   }
}

/// Builder for a [`DocumentStore`].
///
/// # Example
///
/// ```
/// use docstore_client::DocumentStore;
///
/// let store = DocumentStore::builder()
///     .base_url("http://localhost:8080")
///     .default_database("Northwind")
///     .build();
/// assert_eq!(store.default_database(), "Northwind");
/// ```
#[derive(Default)]
pub struct DocumentStoreBuilder {
   base_url: String,
   default_database: String,
   credential: Option<String>,
   conventions: Option<Conventions>,
   key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl DocumentStoreBuilder {
   pub fn new() -> Self {
      Self::default()
   }

   /// Base URL of the document-store service.
   pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
      self.base_url = base_url.into();
      self
   }

   /// Default database sessions and channels fall back to. Must be non-empty
   /// before `initialize()` succeeds.
   pub fn default_database(mut self, database: impl Into<String>) -> Self {
      self.default_database = database.into();
      self
   }

   /// Credential applied as a bearer token on every channel request.
   pub fn credential(mut self, credential: impl Into<String>) -> Self {
      self.credential = Some(credential.into());
      self
   }

   /// Conventions to use instead of the defaults.
   pub fn conventions(mut self, conventions: Conventions) -> Self {
      self.conventions = Some(conventions);
      self
   }

   /// Replace the Hi-Lo default with a custom key generator.
   ///
   /// The generator is installed by `initialize()` in place of the built-in
   /// [`HiLoKeyGenerator`]. Intended for custom identifier schemes and for
   /// tests.
   pub fn key_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
      self.key_generator = Some(generator);
      self
   }

   /// Build the store. The store is not initialized yet; call
   /// [`DocumentStore::initialize`] before opening sessions or generating
   /// identifiers.
   pub fn build(self) -> DocumentStore {
      DocumentStore {
         inner: Arc::new(StoreInner {
            registry: Arc::new(ChannelRegistry::new(
               self.base_url,
               self.default_database,
               self.credential,
               self.conventions,
            )),
            injected_generator: self.key_generator,
            initialized: AtomicBool::new(false),
            key_generator: RwLock::new(None),
            operations: RwLock::new(None),
         }),
      }
   }
}
