//! Maintenance-operations facade for the default database

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::Result;
use crate::channel::{ChannelCommand, RequestChannel};

/// Server-maintenance command surface bound to the default database.
///
/// Created lazily by the store on first post-initialization access and cached
/// for reuse. Commands go through the default database's request channel; no
/// retries, no interception.
pub struct Operations {
   channel: Arc<RequestChannel>,
}

impl Operations {
   pub(crate) fn new(channel: Arc<RequestChannel>) -> Self {
      Self { channel }
   }

   /// The channel commands are dispatched through.
   pub fn request_channel(&self) -> &Arc<RequestChannel> {
      &self.channel
   }

   /// Execute one maintenance command and return its JSON response.
   pub async fn send(&self, command: ChannelCommand) -> Result<JsonValue> {
      self.channel.execute(command).await
   }
}

impl std::fmt::Debug for Operations {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Operations")
         .field("database", &self.channel.database())
         .finish_non_exhaustive()
   }
}
