//! Hi-Lo document identifier generation
//!
//! The store consumes the [`KeyGenerator`] contract; [`HiLoKeyGenerator`] is
//! the production implementation. It reserves contiguous identifier ranges
//! from the document-store service and hands them out locally until
//! exhausted, minimizing round trips. Range reservation goes through the
//! [`RangeAllocator`] seam so that the replenishment transport can be swapped
//! out (and stubbed in tests).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::Result;
use crate::channel::ChannelCommand;
use crate::conventions::Conventions;
use crate::error::Error;
use crate::registry::ChannelRegistry;

/// Explicit named-type capability for identifier generation.
///
/// Callers wanting type-based identifiers supply the type name directly
/// (`&str` or `String`) or pass a descriptor value that declares its name.
/// There is no runtime reflection over arbitrary values.
pub trait NamedType: Sync {
   /// The declared name of the document type, e.g. `Order`.
   fn type_name(&self) -> &str;
}

impl<'a> NamedType for &'a str {
   fn type_name(&self) -> &str {
      self
   }
}

impl NamedType for String {
   fn type_name(&self) -> &str {
      self
   }
}

/// A value standing in for a document type, declaring its name explicitly.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
   pub name: &'static str,
}

impl NamedType for TypeDescriptor {
   fn type_name(&self) -> &str {
      self.name
   }
}

/// One contiguous identifier range reserved from the service.
///
/// `low..=high`, both inclusive; `low` is the first identifier to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
   pub low: i64,
   pub high: i64,
}

/// Contract the store consumes for document identifier generation.
#[async_trait]
pub trait KeyGenerator: Send + Sync {
   /// Generate the next document identifier.
   ///
   /// `type_name` is the effective document type name, already resolved by
   /// the caller; `database` overrides the store default when present. May
   /// suspend while a new identifier range is reserved from the service.
   async fn generate_document_key(
      &self,
      entity: &JsonValue,
      type_name: Option<&str>,
      database: Option<&str>,
   ) -> Result<String>;

   /// Release any reserved-but-unused identifier range back to the service.
   ///
   /// Must not fail when nothing is reserved.
   async fn return_unused_range(&self) -> Result<()>;
}

/// Range-reservation seam used by [`HiLoKeyGenerator`].
///
/// The production implementation performs one round trip per call through the
/// store's channel cache; tests substitute scripted allocators.
#[async_trait]
pub trait RangeAllocator: Send + Sync {
   /// Reserve the next range for `tag` from the given database.
   async fn next_range(&self, tag: &str, database: Option<&str>) -> Result<IdRange>;

   /// Report `last_used..=end` of a reserved range as released.
   async fn return_range(
      &self,
      tag: &str,
      last_used: i64,
      end: i64,
      database: Option<&str>,
   ) -> Result<()>;
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct TagKey {
   database: Option<String>,
   tag: String,
}

/// `next` is the next identifier to hand out; `next > max` means the range is
/// exhausted (or was never reserved).
struct TagState {
   next: i64,
   max: i64,
}

/// Hi-Lo identifier generator with per-tag cached ranges.
///
/// One instance serves every database of a store. Range replenishment is
/// serialized per tag and database; generation for distinct tags proceeds
/// independently.
pub struct HiLoKeyGenerator {
   conventions: Arc<Conventions>,
   allocator: Arc<dyn RangeAllocator>,
   states: Mutex<HashMap<TagKey, Arc<AsyncMutex<TagState>>>>,
}

impl HiLoKeyGenerator {
   pub fn new(conventions: Arc<Conventions>, allocator: Arc<dyn RangeAllocator>) -> Self {
      Self {
         conventions,
         allocator,
         states: Mutex::new(HashMap::new()),
      }
   }

   fn tag_for(&self, type_name: Option<&str>) -> String {
      match type_name {
         Some(name) => self.conventions.collection_name_for(name),
         None => self.conventions.untyped_collection.clone(),
      }
   }

   fn state_for(&self, key: TagKey) -> Arc<AsyncMutex<TagState>> {
      let mut states = self.states.lock();
      Arc::clone(
         states
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(TagState { next: 1, max: 0 }))),
      )
   }
}

#[async_trait]
impl KeyGenerator for HiLoKeyGenerator {
   async fn generate_document_key(
      &self,
      _entity: &JsonValue,
      type_name: Option<&str>,
      database: Option<&str>,
   ) -> Result<String> {
      let tag = self.tag_for(type_name);
      let state = self.state_for(TagKey {
         database: database.map(str::to_string),
         tag: tag.clone(),
      });

      // The per-tag lock serializes replenishment; other tags are untouched.
      let mut state = state.lock().await;
      if state.next > state.max {
         let range = self.allocator.next_range(&tag, database).await?;
         debug!(tag = %tag, low = range.low, high = range.high, "reserved identifier range");
         state.next = range.low;
         state.max = range.high;
      }

      let id = state.next;
      state.next += 1;
      Ok(format!(
         "{}{}{}",
         tag, self.conventions.identifier_parts_separator, id
      ))
   }

   async fn return_unused_range(&self) -> Result<()> {
      let entries: Vec<(TagKey, Arc<AsyncMutex<TagState>>)> = {
         let states = self.states.lock();
         states
            .iter()
            .map(|(key, state)| (key.clone(), Arc::clone(state)))
            .collect()
      };

      for (key, state) in entries {
         let mut state = state.lock().await;
         if state.next > state.max {
            continue;
         }

         let (last_used, end) = (state.next - 1, state.max);
         self
            .allocator
            .return_range(&key.tag, last_used, end, key.database.as_deref())
            .await?;
         debug!(tag = %key.tag, last_used, end, "returned unused identifier range");

         // Mark the range consumed so a repeated drain reports nothing.
         state.next = state.max + 1;
      }

      Ok(())
   }
}

/// Default allocator: reserves ranges from the document-store service through
/// the store's channel cache, one round trip per call, no retries.
pub(crate) struct HttpRangeAllocator {
   channels: Arc<ChannelRegistry>,
}

impl HttpRangeAllocator {
   pub(crate) fn new(channels: Arc<ChannelRegistry>) -> Self {
      Self { channels }
   }
}

#[async_trait]
impl RangeAllocator for HttpRangeAllocator {
   async fn next_range(&self, tag: &str, database: Option<&str>) -> Result<IdRange> {
      let channel = self.channels.get_or_create(database)?;
      let payload = channel
         .execute(ChannelCommand::get(format!("hilo/next?tag={tag}")))
         .await?;

      let range: IdRange = serde_json::from_value(payload)?;
      if range.low < 1 || range.low > range.high {
         return Err(Error::Allocation {
            database: channel.database().to_string(),
            message: format!("service returned invalid range {}..{}", range.low, range.high),
         });
      }
      Ok(range)
   }

   async fn return_range(
      &self,
      tag: &str,
      last_used: i64,
      end: i64,
      database: Option<&str>,
   ) -> Result<()> {
      let channel = self.channels.get_or_create(database)?;
      channel
         .execute(ChannelCommand::post(
            "hilo/return",
            serde_json::json!({ "tag": tag, "last": last_used, "end": end }),
         ))
         .await?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::sync::atomic::{AtomicUsize, Ordering};

   /// Hands out scripted ranges in order and records returned ranges.
   struct ScriptedAllocator {
      ranges: Mutex<Vec<IdRange>>,
      fetches: AtomicUsize,
      returns: Mutex<Vec<(String, i64, i64, Option<String>)>>,
   }

   impl ScriptedAllocator {
      fn new(ranges: Vec<IdRange>) -> Arc<Self> {
         Arc::new(Self {
            ranges: Mutex::new(ranges),
            fetches: AtomicUsize::new(0),
            returns: Mutex::new(Vec::new()),
         })
      }
   }

   #[async_trait]
   impl RangeAllocator for ScriptedAllocator {
      async fn next_range(&self, _tag: &str, _database: Option<&str>) -> Result<IdRange> {
         self.fetches.fetch_add(1, Ordering::SeqCst);
         let mut ranges = self.ranges.lock();
         if ranges.is_empty() {
            return Err(Error::Allocation {
               database: "test".into(),
               message: "no ranges scripted".into(),
            });
         }
         Ok(ranges.remove(0))
      }

      async fn return_range(
         &self,
         tag: &str,
         last_used: i64,
         end: i64,
         database: Option<&str>,
      ) -> Result<()> {
         self
            .returns
            .lock()
            .push((tag.to_string(), last_used, end, database.map(str::to_string)));
         Ok(())
      }
   }

   fn generator(allocator: Arc<ScriptedAllocator>) -> HiLoKeyGenerator {
      HiLoKeyGenerator::new(Arc::new(Conventions::default()), allocator)
   }

   #[tokio::test]
   async fn test_ids_are_sequential_within_a_range() {
      let allocator = ScriptedAllocator::new(vec![IdRange { low: 1, high: 3 }]);
      let generator = generator(Arc::clone(&allocator));
      let entity = serde_json::json!({});

      for expected in ["orders/1", "orders/2", "orders/3"] {
         let key = generator
            .generate_document_key(&entity, Some("Order"), None)
            .await
            .unwrap();
         assert_eq!(key, expected);
      }
      assert_eq!(allocator.fetches.load(Ordering::SeqCst), 1);
   }

   #[tokio::test]
   async fn test_exhaustion_triggers_one_replenishment() {
      let allocator =
         ScriptedAllocator::new(vec![IdRange { low: 1, high: 2 }, IdRange { low: 7, high: 12 }]);
      let generator = generator(Arc::clone(&allocator));
      let entity = serde_json::json!({});

      for _ in 0..2 {
         generator
            .generate_document_key(&entity, Some("Order"), None)
            .await
            .unwrap();
      }
      let key = generator
         .generate_document_key(&entity, Some("Order"), None)
         .await
         .unwrap();

      assert_eq!(key, "orders/7");
      assert_eq!(allocator.fetches.load(Ordering::SeqCst), 2);
   }

   #[tokio::test]
   async fn test_tags_have_independent_ranges() {
      let allocator =
         ScriptedAllocator::new(vec![IdRange { low: 1, high: 10 }, IdRange { low: 1, high: 10 }]);
      let generator = generator(Arc::clone(&allocator));
      let entity = serde_json::json!({});

      let order = generator
         .generate_document_key(&entity, Some("Order"), None)
         .await
         .unwrap();
      let product = generator
         .generate_document_key(&entity, Some("Product"), None)
         .await
         .unwrap();

      assert_eq!(order, "orders/1");
      assert_eq!(product, "products/1");
      assert_eq!(allocator.fetches.load(Ordering::SeqCst), 2);
   }

   #[tokio::test]
   async fn test_untyped_entities_use_fallback_collection() {
      let allocator = ScriptedAllocator::new(vec![IdRange { low: 1, high: 10 }]);
      let generator = generator(allocator);
      let entity = serde_json::json!({});

      let key = generator
         .generate_document_key(&entity, None, None)
         .await
         .unwrap();
      assert_eq!(key, "items/1");
   }

   #[tokio::test]
   async fn test_separator_comes_from_conventions() {
      let allocator = ScriptedAllocator::new(vec![IdRange { low: 1, high: 10 }]);
      let conventions = Conventions {
         identifier_parts_separator: "-".to_string(),
         ..Default::default()
      };
      let generator = HiLoKeyGenerator::new(Arc::new(conventions), allocator);
      let entity = serde_json::json!({});

      let key = generator
         .generate_document_key(&entity, Some("Order"), None)
         .await
         .unwrap();
      assert_eq!(key, "orders-1");
   }

   #[tokio::test]
   async fn test_return_unused_range_reports_once() {
      let allocator = ScriptedAllocator::new(vec![IdRange { low: 1, high: 10 }]);
      let generator = generator(Arc::clone(&allocator));
      let entity = serde_json::json!({});

      generator
         .generate_document_key(&entity, Some("Order"), Some("Sales"))
         .await
         .unwrap();

      generator.return_unused_range().await.unwrap();
      generator.return_unused_range().await.unwrap();

      let returns = allocator.returns.lock();
      assert_eq!(returns.len(), 1);
      assert_eq!(
         returns[0],
         ("orders".to_string(), 1, 10, Some("Sales".to_string()))
      );
   }

   #[tokio::test]
   async fn test_return_unused_range_without_reservation_is_noop() {
      let allocator = ScriptedAllocator::new(vec![]);
      let generator = generator(Arc::clone(&allocator));

      generator.return_unused_range().await.unwrap();
      assert!(allocator.returns.lock().is_empty());
   }

   #[tokio::test]
   async fn test_fully_used_range_is_not_returned() {
      let allocator = ScriptedAllocator::new(vec![IdRange { low: 1, high: 1 }]);
      let generator = generator(Arc::clone(&allocator));
      let entity = serde_json::json!({});

      generator
         .generate_document_key(&entity, Some("Order"), None)
         .await
         .unwrap();
      generator.return_unused_range().await.unwrap();

      assert!(allocator.returns.lock().is_empty());
   }
}
