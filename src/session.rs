//! Unit-of-work sessions bound to one request channel

use std::sync::Arc;

use uuid::Uuid;

use crate::channel::RequestChannel;
use crate::conventions::Conventions;
use crate::store::DocumentStore;

/// Options for opening a session.
///
/// Collapses the overloaded open-session inputs into one record: an optional
/// database-name override and an optional pre-resolved channel. Missing
/// fields fall back to the store default and the store's channel cache.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
   /// Database to bind the session to; the store default when absent.
   pub database: Option<String>,
   /// Channel to bind the session to; resolved through the store's cache
   /// when absent.
   pub request_channel: Option<Arc<RequestChannel>>,
}

/// A short-lived unit of work bound to exactly one database.
///
/// Every open-session call yields a distinct instance with a fresh session
/// id, even for identical arguments. The store never retains a reference to
/// the sessions it creates; a session borrows its channel from the store's
/// cache and owns nothing else that outlives it.
pub struct Session {
   id: Uuid,
   database: String,
   store: DocumentStore,
   channel: Arc<RequestChannel>,
}

impl Session {
   pub(crate) fn new(
      database: String,
      store: DocumentStore,
      channel: Arc<RequestChannel>,
      id: Uuid,
   ) -> Self {
      Self {
         id,
         database,
         store,
         channel,
      }
   }

   /// Unique identifier of this session.
   pub fn id(&self) -> Uuid {
      self.id
   }

   /// The database this session is bound to.
   pub fn database(&self) -> &str {
      &self.database
   }

   /// The channel this session dispatches requests through.
   pub fn request_channel(&self) -> &Arc<RequestChannel> {
      &self.channel
   }

   /// The store that opened this session.
   pub fn store(&self) -> &DocumentStore {
      &self.store
   }

   /// The conventions instance shared with the owning store.
   pub fn conventions(&self) -> Arc<Conventions> {
      self.store.conventions()
   }
}

impl std::fmt::Debug for Session {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Session")
         .field("id", &self.id)
         .field("database", &self.database)
         .finish_non_exhaustive()
   }
}
