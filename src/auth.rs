use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::error::FolioError;
use crate::firestore::error_message;

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub local_id: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True once the token is within a minute of expiring.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

pub trait AuthClient: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, FolioError>;
    fn refresh(&self, session: &Session) -> Result<Session, FolioError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    refresh_token: String,
    expires_in: String,
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Clone)]
pub struct IdentityHttpClient {
    client: Client,
    api_key: String,
}

impl IdentityHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, FolioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("folio/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FolioError::AuthFailed(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| FolioError::AuthFailed(err.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, FolioError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(FolioError::AuthFailed(describe_auth_error(&error_message(
            &body,
        ))))
    }
}

impl AuthClient for IdentityHttpClient {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, FolioError> {
        debug!(email, "identity.signInWithPassword");
        let response = self
            .client
            .post(SIGN_IN_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let payload: SignInResponse = response
            .json()
            .map_err(|err| FolioError::AuthFailed(err.to_string()))?;
        Ok(Session {
            email: payload.email.unwrap_or_else(|| email.to_string()),
            local_id: payload.local_id,
            id_token: payload.id_token,
            refresh_token: payload.refresh_token,
            expires_at: expiry_from(&payload.expires_in)?,
        })
    }

    fn refresh(&self, session: &Session) -> Result<Session, FolioError> {
        debug!(email = %session.email, "securetoken.refresh");
        let response = self
            .client
            .post(REFRESH_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let payload: RefreshResponse = response
            .json()
            .map_err(|err| FolioError::AuthFailed(err.to_string()))?;
        Ok(Session {
            email: session.email.clone(),
            local_id: session.local_id.clone(),
            id_token: payload.id_token,
            refresh_token: payload.refresh_token,
            expires_at: expiry_from(&payload.expires_in)?,
        })
    }
}

fn expiry_from(expires_in: &str) -> Result<DateTime<Utc>, FolioError> {
    let secs = expires_in
        .trim()
        .parse::<u64>()
        .map_err(|_| FolioError::AuthFailed(format!("invalid token lifetime: {expires_in}")))?;
    let lifetime = chrono::Duration::from_std(Duration::from_secs(secs))
        .map_err(|err| FolioError::AuthFailed(err.to_string()))?;
    Ok(Utc::now() + lifetime)
}

/// Turns Identity Toolkit error codes into readable messages.
pub fn describe_auth_error(code: &str) -> String {
    let head = code.split([' ', ':']).next().unwrap_or(code);
    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "invalid email or password".to_string()
        }
        "USER_DISABLED" => "this account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too many attempts, try again later".to_string(),
        "INVALID_EMAIL" => "invalid email address".to_string(),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => {
            "session expired, sign in again".to_string()
        }
        _ => code.to_string(),
    }
}

/// Session file on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Utf8PathBuf,
}

impl SessionStore {
    pub fn new() -> Result<Self, FolioError> {
        let path = ProjectDirs::from("", "", "folio")
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("session.json")).ok()
            })
            .ok_or_else(|| {
                FolioError::Filesystem("unable to resolve session directory".to_string())
            })?;
        Ok(Self { path })
    }

    pub fn new_with_path(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, FolioError> {
        if !self.path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(self.path.as_std_path())
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        let session = serde_json::from_str(&content)
            .map_err(|err| FolioError::Filesystem(format!("corrupt session file: {err}")))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), FolioError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| FolioError::Filesystem("invalid session path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(session)
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        let mut temp = NamedTempFile::new_in(parent.as_std_path())
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        std::io::Write::write_all(&mut temp, &content)
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<bool, FolioError> {
        if !self.path.as_std_path().exists() {
            return Ok(false);
        }
        fs::remove_file(self.path.as_std_path())
            .map_err(|err| FolioError::Filesystem(err.to_string()))?;
        Ok(true)
    }
}

pub fn sign_in<A: AuthClient>(
    auth: &A,
    sessions: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Session, FolioError> {
    let session = auth.sign_in(email.trim(), password)?;
    sessions.save(&session)?;
    info!(email = %session.email, "signed in");
    Ok(session)
}

/// The stored session, refreshed first when its token is about to expire.
pub fn active_session<A: AuthClient>(
    auth: &A,
    sessions: &SessionStore,
) -> Result<Session, FolioError> {
    let session = sessions.load()?.ok_or(FolioError::NotSignedIn)?;
    if !session.is_expired(Utc::now()) {
        return Ok(session);
    }
    let refreshed = auth.refresh(&session)?;
    sessions.save(&refreshed)?;
    debug!(email = %refreshed.email, "refreshed session");
    Ok(refreshed)
}
