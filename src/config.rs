use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_COLLECTION;
use crate::error::FolioError;

pub const CONFIG_FILE_NAME: &str = "folio.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk configuration; keys follow the Firebase web config.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub auth_domain: Option<String>,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default)]
    pub messaging_sender_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub measurement_id: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub firestore_base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub contact: Option<ContactConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactConfig {
    pub endpoint: String,
    #[serde(default)]
    pub access_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_key: String,
    pub project_id: String,
    pub collection: String,
    pub firestore_base_url: Option<String>,
    pub request_timeout: Duration,
    pub contact: Option<ContactConfig>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, else `./folio.json`, else the user config directory.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, FolioError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => default_config_path().ok_or(FolioError::MissingConfig)?,
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FolioError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| FolioError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, FolioError> {
        let api_key = required(config.api_key, "apiKey")?;
        let project_id = required(config.project_id, "projectId")?;
        let collection = config
            .collection
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        if collection.contains('/') {
            return Err(FolioError::ConfigParse(format!(
                "collection must be a top-level collection name: {collection}"
            )));
        }
        let request_timeout = Duration::from_secs(
            config
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        Ok(ResolvedConfig {
            api_key,
            project_id,
            collection,
            firestore_base_url: config
                .firestore_base_url
                .map(|url| url.trim_end_matches('/').to_string()),
            request_timeout,
            contact: config.contact,
        })
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, FolioError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FolioError::ConfigParse(format!("missing required key `{key}`")))
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    ProjectDirs::from("", "", "folio")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
