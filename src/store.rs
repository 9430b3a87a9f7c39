// Remote document store
// Bulk read and key-addressed writes against a REST collection

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::error::StoreError;

/// A document collection that only supports full reads and key-addressed writes
///
/// There is no lookup by field; callers scan the result of [`fetch_all`].
///
/// [`fetch_all`]: DocumentStore::fetch_all
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch every document as `(key, document)` pairs in scan order
    async fn fetch_all(&self) -> Result<Vec<(String, Value)>, StoreError>;

    /// Append a new document under a store-generated key
    async fn insert(&self, document: &Value) -> Result<(), StoreError>;

    /// Overwrite only the given fields of the document at `key`
    async fn patch(&self, key: &str, fields: &Value) -> Result<(), StoreError>;
}

/// Firebase Realtime Database style REST collection
pub struct HttpDocumentStore {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Collection URL without the `.json` suffix
    collection_url: String,
}

impl HttpDocumentStore {
    /// Create a store sharing an existing HTTP client
    pub fn with_client(client: Client, collection_url: &str) -> Self {
        Self {
            client,
            collection_url: collection_url
                .trim_end_matches('/')
                .trim_end_matches(".json")
                .to_string(),
        }
    }

    fn collection_endpoint(&self) -> String {
        format!("{}.json", self.collection_url)
    }

    fn document_endpoint(&self, key: &str) -> String {
        format!("{}/{}.json", self.collection_url, key)
    }

    /// Turn a non-success response into [`StoreError::Status`]
    async fn check_status(response: Response) -> Result<Response, StoreError> {
        let status = response.status();

        tracing::debug!(status = %status, "Received store response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status = status.as_u16(),
            response_body = %body,
            "Store request failed with error response"
        );

        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch_all(&self) -> Result<Vec<(String, Value)>, StoreError> {
        let url = self.collection_endpoint();
        tracing::debug!(url = %url, "Fetching credential collection");

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        // An empty collection is returned as `null`
        let documents: Option<serde_json::Map<String, Value>> = serde_json::from_str(&body)?;

        Ok(documents
            .map(|map| map.into_iter().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, document: &Value) -> Result<(), StoreError> {
        let url = self.collection_endpoint();
        tracing::debug!(url = %url, "Appending credential document");

        let response = self.client.post(&url).json(document).send().await?;
        let response = Self::check_status(response).await?;

        // The generated key is informational only
        if let Ok(created) = response.json::<Value>().await {
            if let Some(key) = created.get("name").and_then(Value::as_str) {
                tracing::debug!(key = %key, "Credential document created");
            }
        }

        Ok(())
    }

    async fn patch(&self, key: &str, fields: &Value) -> Result<(), StoreError> {
        let url = self.document_endpoint(key);
        tracing::debug!(url = %url, "Patching credential document");

        let response = self.client.patch(&url).json(fields).send().await?;
        Self::check_status(response).await?;

        Ok(())
    }
}
