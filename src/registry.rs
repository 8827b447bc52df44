//! Shared per-database channel registry owned by the store

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::Result;
use crate::channel::RequestChannel;
use crate::conventions::Conventions;

/// Append-only cache of request channels keyed by database name, plus the
/// store identity needed to construct them.
///
/// The registry is shared between the store and the identifier-generation
/// machinery so that both resolve channels through the same cache. Entries
/// are inserted only after successful construction and live for the life of
/// the store; there is no eviction.
pub(crate) struct ChannelRegistry {
   base_url: String,
   default_database: String,
   credential: Option<String>,
   initial_conventions: Option<Conventions>,
   conventions: RwLock<Option<Arc<Conventions>>>,
   channels: RwLock<IndexMap<String, Arc<RequestChannel>>>,
}

impl ChannelRegistry {
   pub(crate) fn new(
      base_url: String,
      default_database: String,
      credential: Option<String>,
      initial_conventions: Option<Conventions>,
   ) -> Self {
      Self {
         base_url: base_url.trim_end_matches('/').to_string(),
         default_database,
         credential,
         initial_conventions,
         conventions: RwLock::new(None),
         channels: RwLock::new(IndexMap::new()),
      }
   }

   pub(crate) fn base_url(&self) -> &str {
      &self.base_url
   }

   pub(crate) fn default_database(&self) -> &str {
      &self.default_database
   }

   /// The store-wide conventions instance, created on first access.
   ///
   /// A builder-supplied value wins over the default configuration. The same
   /// `Arc` is returned on every call once created.
   pub(crate) fn conventions(&self) -> Arc<Conventions> {
      if let Some(conventions) = self.conventions.read().as_ref() {
         return Arc::clone(conventions);
      }

      let mut slot = self.conventions.write();
      // Re-check: another caller may have won the race between the locks.
      if let Some(conventions) = slot.as_ref() {
         return Arc::clone(conventions);
      }

      let conventions = Arc::new(self.initial_conventions.clone().unwrap_or_default());
      *slot = Some(Arc::clone(&conventions));
      conventions
   }

   /// Resolve the channel for `database`, falling back to the default
   /// database name, creating and caching it on first use.
   ///
   /// The check-then-insert runs under the write lock, so at most one channel
   /// is ever constructed per distinct name even under concurrent callers. A
   /// failed construction inserts nothing.
   pub(crate) fn get_or_create(&self, database: Option<&str>) -> Result<Arc<RequestChannel>> {
      let name = database.unwrap_or(&self.default_database);

      if let Some(channel) = self.channels.read().get(name) {
         return Ok(Arc::clone(channel));
      }

      let mut channels = self.channels.write();
      if let Some(channel) = channels.get(name) {
         return Ok(Arc::clone(channel));
      }

      let channel = Arc::new(RequestChannel::new(
         &self.base_url,
         name,
         self.credential.as_deref(),
         self.conventions(),
      )?);
      channels.insert(name.to_string(), Arc::clone(&channel));
      Ok(channel)
   }
}
