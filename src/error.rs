//! Error types for docstore-client

use thiserror::Error;

/// Errors that may occur when coordinating a document store.
///
/// Configuration errors (`MissingDefaultDatabase`, `NotInitialized`) are
/// raised synchronously for programmer-misuse conditions and are never
/// retried. Allocation and transport errors surface asynchronously from the
/// collaborators and propagate unchanged.
#[derive(Debug, Error)]
pub enum Error {
   /// The store was built without a default database name. Set one on the
   /// builder before calling `initialize()`.
   #[error("no default database is configured - set one on the builder before calling initialize()")]
   MissingDefaultDatabase,

   /// An initialization-gated operation was invoked before `initialize()`
   /// succeeded. Every gated operation raises this same error.
   #[error(
      "store has not been initialized - call initialize() before opening sessions, generating identifiers, or accessing operations"
   )]
   NotInitialized,

   /// Identifier allocation failed, e.g. the document-store service is
   /// unreachable or returned an invalid range.
   #[error("identifier allocation failed for database '{database}': {message}")]
   Allocation { database: String, message: String },

   /// Error from the HTTP transport layer. Never wrapped or retried.
   #[error(transparent)]
   Transport(#[from] reqwest::Error),

   /// An entity could not be serialized for identifier generation, or a
   /// server payload could not be decoded.
   #[error("serialization error: {0}")]
   Serialization(#[from] serde_json::Error),

   /// Generic error for operations that don't fit other categories.
   #[error("{0}")]
   Other(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::MissingDefaultDatabase => "MISSING_DEFAULT_DATABASE".to_string(),
         Error::NotInitialized => "NOT_INITIALIZED".to_string(),
         Error::Allocation { .. } => "ALLOCATION_ERROR".to_string(),
         Error::Transport(_) => "TRANSPORT_ERROR".to_string(),
         Error::Serialization(_) => "SERIALIZATION_ERROR".to_string(),
         Error::Other(_) => "ERROR".to_string(),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_missing_default_database() {
      assert_eq!(
         Error::MissingDefaultDatabase.error_code(),
         "MISSING_DEFAULT_DATABASE"
      );
   }

   #[test]
   fn test_error_code_not_initialized() {
      let err = Error::NotInitialized;
      assert_eq!(err.error_code(), "NOT_INITIALIZED");
      assert!(err.to_string().contains("initialize()"));
   }

   #[test]
   fn test_error_code_allocation() {
      let err = Error::Allocation {
         database: "Northwind".into(),
         message: "service unreachable".into(),
      };
      assert_eq!(err.error_code(), "ALLOCATION_ERROR");
      assert!(err.to_string().contains("Northwind"));
      assert!(err.to_string().contains("service unreachable"));
   }

   #[test]
   fn test_error_code_serialization() {
      let err = Error::Serialization(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
      assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
   }

   #[test]
   fn test_error_code_other() {
      let err = Error::Other("something went wrong".into());
      assert_eq!(err.error_code(), "ERROR");
      assert_eq!(err.to_string(), "something went wrong");
   }
}
