//! Conventions describing naming policy for documents and identifiers

use serde::{Deserialize, Serialize};

/// Naming conventions shared by all request channels and sessions of a store.
///
/// A store creates one `Conventions` instance lazily on first access (or uses
/// the one supplied to the builder) and hands the same instance to every
/// channel and session created afterwards. The struct is read-only after
/// construction.
///
/// # Examples
///
/// ```
/// use docstore_client::Conventions;
///
/// // Use defaults
/// let conventions = Conventions::default();
/// assert_eq!(conventions.collection_name_for("Order"), "orders");
///
/// // Customize specific fields
/// let conventions = Conventions {
///     identifier_parts_separator: "-".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conventions {
   /// Separator between the collection tag and the numeric part of a
   /// generated document identifier, e.g. the `/` in `orders/42`.
   ///
   /// Default: `/`
   pub identifier_parts_separator: String,

   /// Collection tag used for identifier generation when the caller supplies
   /// no type name.
   ///
   /// Default: `items`
   pub untyped_collection: String,

   /// Whether collection names derived from type names are pluralized with a
   /// trailing `s`. The pluralization is naive: names already ending in `s`
   /// are left alone.
   ///
   /// Default: `true`
   pub pluralize_collection_names: bool,
}

impl Default for Conventions {
   fn default() -> Self {
      Self {
         identifier_parts_separator: "/".to_string(),
         untyped_collection: "items".to_string(),
         pluralize_collection_names: true,
      }
   }
}

impl Conventions {
   /// Derive the collection tag for a document type name.
   ///
   /// Lowercases the name and, when [`pluralize_collection_names`] is set,
   /// appends a trailing `s` unless one is already present.
   ///
   /// [`pluralize_collection_names`]: Self::pluralize_collection_names
   pub fn collection_name_for(&self, type_name: &str) -> String {
      let mut name = type_name.to_lowercase();
      if self.pluralize_collection_names && !name.ends_with('s') {
         name.push('s');
      }
      name
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let conventions = Conventions::default();
      assert_eq!(conventions.identifier_parts_separator, "/");
      assert_eq!(conventions.untyped_collection, "items");
      assert!(conventions.pluralize_collection_names);
   }

   #[test]
   fn test_collection_name_is_lowercased_and_pluralized() {
      let conventions = Conventions::default();
      assert_eq!(conventions.collection_name_for("Order"), "orders");
      assert_eq!(conventions.collection_name_for("ShipmentItem"), "shipmentitems");
   }

   #[test]
   fn test_collection_name_keeps_existing_plural() {
      let conventions = Conventions::default();
      assert_eq!(conventions.collection_name_for("Address"), "address");
   }

   #[test]
   fn test_collection_name_without_pluralization() {
      let conventions = Conventions {
         pluralize_collection_names: false,
         ..Default::default()
      };
      assert_eq!(conventions.collection_name_for("Order"), "order");
   }
}
