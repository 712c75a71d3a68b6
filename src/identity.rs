//! Service account authentication and account lookup against the identity provider

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
https://www.googleapis.com/auth/firebase.database \
https://www.googleapis.com/auth/userinfo.email \
https://www.googleapis.com/auth/identitytoolkit";

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// The `firebase-sdk.json` service account key downloaded from the console.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> DeployResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> DeployResult<Self> {
        let account: ServiceAccount = serde_json::from_str(contents)
            .map_err(|e| DeployError::Credentials(format!("malformed service account: {}", e)))?;

        if let Some(kind) = &account.account_type {
            if kind != "service_account" {
                return Err(DeployError::Credentials(format!(
                    "expected a service_account key, got {}",
                    kind
                )));
            }
        }

        Ok(account)
    }

    /// Signs the JWT assertion exchanged for an access token
    fn assertion(&self) -> DeployResult<String> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| DeployError::Credentials(format!("invalid private key: {}", e)))?;

        encode(&header, &claims, &key)
            .map_err(|e| DeployError::Credentials(format!("failed to sign assertion: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    email: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Where access tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    ServiceAccount(ServiceAccount),
    /// A token issued out of band, e.g. `gcloud auth print-access-token`
    Static {
        access_token: String,
        project_id: String,
    },
}

impl TokenSource {
    pub fn project_id(&self) -> &str {
        match self {
            TokenSource::ServiceAccount(account) => &account.project_id,
            TokenSource::Static { project_id, .. } => project_id,
        }
    }
}

#[derive(Debug)]
pub struct IdentityClient {
    http: Client,
    source: TokenSource,
    identity_url: String,
    access_token: Option<String>,
}

impl IdentityClient {
    pub fn new(source: TokenSource) -> DeployResult<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            source,
            identity_url: IDENTITY_TOOLKIT_URL.to_string(),
            access_token: None,
        })
    }

    /// Points account lookups at another identity endpoint (emulator, test server)
    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the access token, exchanging the service account assertion on first use
    pub async fn access_token(&mut self) -> DeployResult<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }

        let token = match &self.source {
            TokenSource::Static { access_token, .. } => access_token.clone(),
            TokenSource::ServiceAccount(account) => self.exchange(account).await?,
        };

        self.access_token = Some(token.clone());
        Ok(token)
    }

    async fn exchange(&self, account: &ServiceAccount) -> DeployResult<String> {
        debug!("Requesting access token for {}", account.client_email);
        let assertion = account.assertion()?;

        let response = self
            .http
            .post(&account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!("Access token issued, expires in {:?}s", token.expires_in);
        Ok(token.access_token)
    }

    /// Looks up the account registered under `email`
    pub async fn get_user_by_email(&mut self, email: &str) -> DeployResult<UserRecord> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/projects/{}/accounts:lookup",
            self.identity_url,
            self.source.project_id()
        );
        debug!("Looking up {} via {}", email, url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&LookupRequest { email: [email] })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let lookup: LookupResponse = response.json().await?;
                lookup
                    .users
                    .into_iter()
                    .next()
                    .ok_or_else(|| DeployError::UserNotFound(email.to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                Err(DeployError::Auth { status, body })
            }
            StatusCode::NOT_FOUND => Err(DeployError::UserNotFound(email.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(DeployError::UnexpectedResponse(format!(
                    "account lookup returned HTTP {} - {}",
                    status, body
                )))
            }
        }
    }

    /// Resolves the account identifier (uid) for `email`
    pub async fn get_uid_by_email(&mut self, email: &str) -> DeployResult<String> {
        let user = self.get_user_by_email(email).await?;
        info!("User id: {}", user.local_id);
        Ok(user.local_id)
    }
}
