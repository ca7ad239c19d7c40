use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::FirestoreSettings;
use crate::entities::Document;
use crate::repositories::{
    document::{DocumentStore, StoreError},
    token::{ServiceAccountTokens, StaticToken, TokenSource},
};

/// Collection probed by [`DocumentStore::ping`].
const PING_COLLECTION: &str = "test";

/// Firestore over its REST API.
///
/// Documents are flat string maps; each field is written as a
/// `stringValue`.
pub struct FirestoreStore {
    client: Client,
    documents_url: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl FirestoreStore {
    pub fn new(base_url: &str, project_id: &str, tokens: Arc<dyn TokenSource>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, base_url, project_id, tokens))
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        project_id: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
            tokens,
        }
    }

    /// Build from configuration, choosing emulator or service-account auth.
    pub fn from_settings(settings: &FirestoreSettings) -> Result<Self, StoreError> {
        let project_id = &settings.credentials.project_id;
        match &settings.emulator_host {
            Some(host) => Self::new(
                &format!("http://{host}/v1"),
                project_id,
                Arc::new(StaticToken("owner".to_string())),
            ),
            None => {
                let client = Client::builder()
                    .connect_timeout(Duration::from_secs(10))
                    .timeout(Duration::from_secs(30))
                    .build()?;
                let tokens = ServiceAccountTokens::new(client.clone(), &settings.credentials)?;
                Ok(Self::with_client(
                    client,
                    &settings.base_url,
                    project_id,
                    Arc::new(tokens),
                ))
            }
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .get(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let raw: FirestoreDocument = response.json().await?;
                decode_fields(id, raw.fields).map(Some)
            }
            status => Err(status_error(status, response).await),
        }
    }

    #[instrument(skip(self, document))]
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        let token = self.tokens.token().await?;
        let body = FirestoreDocument {
            fields: encode_fields(document),
        };
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        debug!("Wrote {}/{}", collection, id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .get(format!("{}/{}", self.documents_url, PING_COLLECTION))
            .query(&[("pageSize", "1")])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        Ok(())
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> StoreError {
    StoreError::Status {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

fn encode_fields(document: Document) -> BTreeMap<String, Value> {
    document
        .into_iter()
        .map(|(k, v)| (k, serde_json::json!({ "stringValue": v })))
        .collect()
}

fn decode_fields(id: &str, fields: BTreeMap<String, Value>) -> Result<Document, StoreError> {
    fields
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::Object(typed) => match typed.into_iter().next() {
                    Some((kind, inner)) => match (kind.as_str(), inner) {
                        ("nullValue", _) => String::new(),
                        (_, Value::String(s)) => s,
                        (_, Value::Bool(b)) => b.to_string(),
                        (_, Value::Number(n)) => n.to_string(),
                        (kind, _) => {
                            return Err(StoreError::Malformed {
                                id: id.to_string(),
                                reason: format!("field '{name}' has unsupported type {kind}"),
                            });
                        }
                    },
                    None => String::new(),
                },
                other => {
                    return Err(StoreError::Malformed {
                        id: id.to_string(),
                        reason: format!("field '{name}' is not a typed value: {other}"),
                    });
                }
            };
            Ok((name, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_fields_as_string_values() {
        let mut doc = Document::new();
        doc.insert("price".into(), "5.000 €".into());
        let encoded = encode_fields(doc);
        assert_eq!(encoded["price"], json!({"stringValue": "5.000 €"}));
    }

    #[test]
    fn test_decode_typed_values() {
        let fields: BTreeMap<String, Value> = serde_json::from_value(json!({
            "title": {"stringValue": "Giulia"},
            "mileage": {"integerValue": "150000"},
            "power": {"nullValue": null},
            "sold": {"booleanValue": false}
        }))
        .unwrap();

        let doc = decode_fields("abc", fields).unwrap();
        assert_eq!(doc["title"], "Giulia");
        assert_eq!(doc["mileage"], "150000");
        assert_eq!(doc["power"], "");
        assert_eq!(doc["sold"], "false");
    }

    #[test]
    fn test_decode_rejects_nested_maps() {
        let fields: BTreeMap<String, Value> = serde_json::from_value(json!({
            "meta": {"mapValue": {"fields": {}}}
        }))
        .unwrap();
        assert!(matches!(
            decode_fields("abc", fields),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_document_url() {
        let store = FirestoreStore::with_client(
            Client::new(),
            "https://firestore.googleapis.com/v1/",
            "cars-123",
            Arc::new(StaticToken("t".into())),
        );
        assert_eq!(
            store.document_url("posts", "abc"),
            "https://firestore.googleapis.com/v1/projects/cars-123/databases/(default)/documents/posts/abc"
        );
    }
}
