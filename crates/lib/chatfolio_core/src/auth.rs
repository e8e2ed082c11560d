//! Provider credentials and OAuth2 access tokens.
//!
//! Google service accounts authenticate with a self-signed RS256 JWT
//! assertion that is exchanged for a short-lived bearer token. Tokens are
//! cached and reused until shortly before they expire.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::nlu::NluError;

/// OAuth scopes required by the Dialogflow sessions API.
pub const DIALOGFLOW_SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/dialogflow";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh cached tokens this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google service-account key, as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, NluError> {
        serde_json::from_str(json)
            .map_err(|e| NluError::Credentials(format!("invalid service account key: {e}")))
    }

    /// Load a key from a JSON file on disk.
    pub fn from_file(path: &Path) -> Result<Self, NluError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            NluError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

/// Supplies bearer tokens for provider requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, NluError>;
}

/// A fixed, externally obtained bearer token.
#[derive(Clone)]
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, NluError> {
        Ok(self.0.clone())
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Exchanges signed service-account assertions for bearer tokens.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Build a token source, validating the private key up front.
    pub fn new(key: ServiceAccountKey, http: Client) -> Result<Self, NluError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| NluError::Credentials(format!("invalid private key: {e}")))?;
        info!(client_email = %key.client_email, "loaded service account credentials");
        Ok(Self {
            key,
            signing_key,
            http,
            cached: RwLock::new(None),
        })
    }

    /// Load the key file at `path` and build a token source from it.
    pub fn from_file(path: &Path, http: Client) -> Result<Self, NluError> {
        Self::new(ServiceAccountKey::from_file(path)?, http)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, NluError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DIALOGFLOW_SCOPES,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        encode(&header, &claims, &self.signing_key)
            .map_err(|e| NluError::Token(format!("jwt encode: {e}")))
    }

    async fn fetch_token(&self) -> Result<CachedToken, NluError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| NluError::Transport(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(NluError::Token(format!(
                "token exchange failed: {status} {body}"
            )));
        }

        let data: TokenResponse = resp
            .json()
            .await
            .map_err(|e| NluError::Decode(format!("token response parse error: {e}")))?;

        debug!(expires_in = data.expires_in, "obtained access token");
        Ok(CachedToken {
            token: data.access_token,
            expires_at: now + Duration::seconds(data.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, NluError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref()
                && token.is_fresh(Utc::now())
            {
                return Ok(token.token.clone());
            }
        }

        // Concurrent callers may both refresh; the last write wins.
        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }
}
