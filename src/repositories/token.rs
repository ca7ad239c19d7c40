use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::FirebaseCredentials;
use crate::repositories::document::StoreError;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for store requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, StoreError>;
}

/// Fixed token, used against the Firestore emulator.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, StoreError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// OAuth2 service-account flow: a self-signed RS256 assertion is exchanged
/// at the token endpoint for an access token, which is cached until shortly
/// before it expires.
pub struct ServiceAccountTokens {
    client: Client,
    client_email: String,
    private_key_id: String,
    token_uri: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(client: Client, credentials: &FirebaseCredentials) -> Result<Self, StoreError> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid private key: {e}")))?;
        Ok(Self {
            client,
            client_email: credentials.client_email.clone(),
            private_key_id: credentials.private_key_id.clone(),
            token_uri: credentials.token_uri.clone(),
            key,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.private_key_id.clone());
        encode(&header, &claims, &self.key)
            .map_err(|e| StoreError::Auth(format!("failed to sign assertion: {e}")))
    }

    #[instrument(skip(self), fields(token_uri = %self.token_uri))]
    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, StoreError> {
        let assertion = self.assertion(now)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        let response = self
            .client
            .post(&self.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token endpoint returned {status}: {text}")));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained access token valid for {}s", token.expires_in);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: refresh_deadline(now, token.expires_in)?,
        })
    }
}

/// When a token issued at `now` and valid for `expires_in` seconds should be
/// replaced.
fn refresh_deadline(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, StoreError> {
    Duration::try_seconds(expires_in.saturating_sub(EXPIRY_MARGIN_SECS))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| StoreError::Auth(format!("token lifetime out of range: {expires_in}s")))
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn token(&self) -> Result<String, StoreError> {
        // Held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.refresh_at > now
        {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
