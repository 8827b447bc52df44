//! Per-database request channel over HTTP

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::Result;
use crate::conventions::Conventions;

/// A command executed against one logical database.
///
/// Commands are one HTTP round trip each: a method, a path below the
/// database root, and an optional JSON body.
#[derive(Debug, Clone)]
pub struct ChannelCommand {
   /// HTTP method of the command.
   pub method: Method,
   /// Path below `{base_url}/databases/{database}/`.
   pub path: String,
   /// Optional JSON request body.
   pub body: Option<JsonValue>,
}

impl ChannelCommand {
   /// Build a GET command for the given path.
   pub fn get(path: impl Into<String>) -> Self {
      Self {
         method: Method::GET,
         path: path.into(),
         body: None,
      }
   }

   /// Build a POST command for the given path and body.
   pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
      Self {
         method: Method::POST,
         path: path.into(),
         body: Some(body),
      }
   }
}

/// Transport handle to one logical database.
///
/// A channel owns the HTTP client for exactly one database name and is created
/// at most once per name for the life of a store; repeated lookups return the
/// same instance. Channels perform no retries and no failover - transport
/// errors propagate unchanged to the caller.
#[derive(Debug)]
pub struct RequestChannel {
   base_url: String,
   database: String,
   credential: Option<String>,
   conventions: Arc<Conventions>,
   client: reqwest::Client,
}

impl RequestChannel {
   /// Create a channel bound to `database` under `base_url`.
   ///
   /// A trailing slash on the base URL is ignored. Client construction
   /// failures are transport errors.
   pub fn new(
      base_url: &str,
      database: &str,
      credential: Option<&str>,
      conventions: Arc<Conventions>,
   ) -> Result<Self> {
      let client = reqwest::Client::builder().build()?;

      debug!(database = %database, "created request channel");

      Ok(Self {
         base_url: base_url.trim_end_matches('/').to_string(),
         database: database.to_string(),
         credential: credential.map(str::to_string),
         conventions,
         client,
      })
   }

   /// The database name this channel is addressed by.
   pub fn database(&self) -> &str {
      &self.database
   }

   /// The service base URL, without a trailing slash.
   pub fn base_url(&self) -> &str {
      &self.base_url
   }

   /// The conventions instance shared with the owning store.
   pub fn conventions(&self) -> &Arc<Conventions> {
      &self.conventions
   }

   /// Execute one command against this channel's database.
   ///
   /// Applies the store credential as a bearer token when present and decodes
   /// the response body as JSON. Non-success status codes are transport
   /// errors.
   pub async fn execute(&self, command: ChannelCommand) -> Result<JsonValue> {
      let url = self.url_for(&command.path);

      let mut request = self.client.request(command.method, &url);
      if let Some(token) = &self.credential {
         request = request.bearer_auth(token);
      }
      if let Some(body) = &command.body {
         request = request.json(body);
      }

      let response = request.send().await?.error_for_status()?;
      Ok(response.json().await?)
   }

   fn url_for(&self, path: &str) -> String {
      format!(
         "{}/databases/{}/{}",
         self.base_url,
         self.database,
         path.trim_start_matches('/')
      )
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn test_channel(base_url: &str) -> RequestChannel {
      RequestChannel::new(base_url, "Northwind", None, Arc::new(Conventions::default())).unwrap()
   }

   #[test]
   fn test_url_joins_database_and_path() {
      let channel = test_channel("http://localhost:8080");
      assert_eq!(
         channel.url_for("hilo/next?tag=orders"),
         "http://localhost:8080/databases/Northwind/hilo/next?tag=orders"
      );
   }

   #[test]
   fn test_url_normalizes_slashes() {
      let channel = test_channel("http://localhost:8080/");
      assert_eq!(channel.base_url(), "http://localhost:8080");
      assert_eq!(
         channel.url_for("/stats"),
         "http://localhost:8080/databases/Northwind/stats"
      );
   }

   #[test]
   fn test_command_constructors() {
      let get = ChannelCommand::get("stats");
      assert_eq!(get.method, Method::GET);
      assert!(get.body.is_none());

      let post = ChannelCommand::post("hilo/return", serde_json::json!({"tag": "orders"}));
      assert_eq!(post.method, Method::POST);
      assert_eq!(post.body.unwrap()["tag"], "orders");
   }
}
