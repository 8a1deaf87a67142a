//! Google service-account authentication
//!
//! Implements the OAuth2 JWT bearer grant: a short-lived assertion signed
//! with the service account's RSA key is exchanged for an access token.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::api::TokenResponse;

/// Default Google OAuth2 token endpoint
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service account key file as downloaded from Google Cloud Console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load a key from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
            .with_context(|| format!("Failed to load service account key: {}", path.display()))
    }

    /// Parse a key from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse service account key JSON")
    }
}

/// Claims of the JWT bearer assertion
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Cached access token
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Service-account OAuth2 token management
///
/// The key file is read lazily on the first token request, so a missing or
/// broken key surfaces as a failed sheet connection rather than a startup
/// error. Tokens are cached in memory until shortly before expiry.
pub struct ServiceAccountAuth {
    key_path: PathBuf,
    agent: ureq::Agent,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Scopes needed to find a spreadsheet by name and append to it
    const SCOPES: &'static str = concat!(
        "https://www.googleapis.com/auth/spreadsheets ",
        "https://www.googleapis.com/auth/drive.readonly"
    );

    /// Assertion lifetime accepted by Google (max one hour)
    const ASSERTION_TTL_SECS: i64 = 3600;

    /// Refresh tokens this many seconds before they expire
    const EXPIRY_BUFFER_SECS: i64 = 300;

    /// Create auth for the key file at `key_path`
    pub fn new(key_path: impl Into<PathBuf>, agent: ureq::Agent) -> Self {
        Self {
            key_path: key_path.into(),
            agent,
            cached: Mutex::new(None),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Get a valid access token, exchanging a new assertion when needed
    pub fn get_access_token(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = self.cached_token(now) {
            return Ok(token);
        }

        let key = ServiceAccountKey::from_file(&self.key_path)?;
        let token = self.exchange_assertion(&key, now)?;

        let expires_at = now + token.expires_in.unwrap_or(3600) as i64;
        debug!(
            "Obtained access token for {} (expires in {}s)",
            key.client_email,
            expires_at - now
        );

        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            });
        }

        Ok(token.access_token)
    }

    /// Forget any cached token
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    fn cached_token(&self, now: i64) -> Option<String> {
        let guard = self.cached.lock().ok()?;
        guard
            .as_ref()
            .filter(|t| t.expires_at > now + Self::EXPIRY_BUFFER_SECS)
            .map(|t| t.access_token.clone())
    }

    /// Exchange a signed assertion for an access token
    fn exchange_assertion(&self, key: &ServiceAccountKey, now: i64) -> Result<TokenResponse> {
        let assertion = build_assertion(key, Self::SCOPES, now, Self::ASSERTION_TTL_SECS)?;

        let mut response = self
            .agent
            .post(&key.token_uri)
            .send_form([
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .context("Failed to exchange service account assertion")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")
    }
}

/// Sign an RS256 JWT assertion for the JWT bearer grant
fn build_assertion(
    key: &ServiceAccountKey,
    scopes: &str,
    now: i64,
    ttl_secs: i64,
) -> Result<String> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scopes.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ttl_secs,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service account private key is not a valid RSA PEM key")?;

    jsonwebtoken::encode(&header, &claims, &encoding_key).context("Failed to sign assertion")
}
