use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use reqwest::{Method, Url};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::error::FolioError;
use crate::store::{CatalogStore, Document, DocumentWrite, Fields, new_document_id};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(#[serde(deserialize_with = "deserialize_double")] f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

/// Non-finite doubles arrive as the strings `NaN`, `Infinity` and
/// `-Infinity`.
fn deserialize_double<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Double {
        Number(f64),
        Text(String),
    }

    match Double::deserialize(deserializer)? {
        Double::Number(value) => Ok(value),
        Double::Text(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other.parse::<f64>().map_err(serde::de::Error::custom),
        },
    }
}

pub fn value_to_json(value: FirestoreValue) -> Value {
    match value {
        FirestoreValue::NullValue(()) => Value::Null,
        FirestoreValue::BooleanValue(flag) => Value::Bool(flag),
        FirestoreValue::IntegerValue(text) => text
            .parse::<i64>()
            .map(|int| Value::Number(Number::from(int)))
            .unwrap_or(Value::String(text)),
        FirestoreValue::DoubleValue(float) => Number::from_f64(float)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FirestoreValue::TimestampValue(text)
        | FirestoreValue::StringValue(text)
        | FirestoreValue::BytesValue(text)
        | FirestoreValue::ReferenceValue(text) => Value::String(text),
        FirestoreValue::GeoPointValue(point) => json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        }),
        FirestoreValue::ArrayValue(array) => {
            Value::Array(array.values.into_iter().map(value_to_json).collect())
        }
        FirestoreValue::MapValue(map) => Value::Object(fields_to_json(map.fields)),
    }
}

pub fn json_to_value(value: &Value) -> FirestoreValue {
    match value {
        Value::Null => FirestoreValue::NullValue(()),
        Value::Bool(flag) => FirestoreValue::BooleanValue(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => FirestoreValue::IntegerValue(int.to_string()),
            None => FirestoreValue::DoubleValue(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => FirestoreValue::StringValue(text.clone()),
        Value::Array(items) => FirestoreValue::ArrayValue(ArrayValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        Value::Object(map) => FirestoreValue::MapValue(MapValue {
            fields: json_to_fields(map),
        }),
    }
}

fn fields_to_json(fields: BTreeMap<String, FirestoreValue>) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| (name, value_to_json(value)))
        .collect()
}

fn json_to_fields(fields: &Fields) -> BTreeMap<String, FirestoreValue> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), json_to_value(value)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Document {
            id,
            fields: fields_to_json(self.fields),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

/// Documents from a `:runQuery` response body. An empty result is a single
/// item carrying only `readTime`. Items that fail to decode are skipped.
pub fn parse_run_query(body: &str) -> Result<Vec<Document>, FolioError> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|err| FolioError::StoreUnavailable(format!("unexpected query response: {err}")))?;
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RunQueryItem>(item) {
            Ok(item) => item.document,
            Err(err) => {
                warn!(error = %err, "skipping undecodable query result");
                None
            }
        })
        .map(FirestoreDocument::into_document)
        .collect())
}

pub fn parse_document(body: &str) -> Result<Document, FolioError> {
    let document: FirestoreDocument = serde_json::from_str(body)
        .map_err(|err| FolioError::StoreUnavailable(format!("unexpected document response: {err}")))?;
    Ok(document.into_document())
}

/// Backtick-quotes field names that are not plain identifiers.
pub fn quote_field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// One `:commit` write. `mask` is `None` for creates.
pub fn build_write(
    document_name: &str,
    write: &DocumentWrite,
    mask: Option<&[String]>,
    exists: bool,
) -> Value {
    let transforms = write
        .server_timestamps
        .iter()
        .map(|name| {
            json!({
                "fieldPath": quote_field_path(name),
                "setToServerValue": "REQUEST_TIME",
            })
        })
        .collect::<Vec<_>>();
    let mut body = json!({
        "update": {
            "name": document_name,
            "fields": json_to_fields(&write.fields),
        },
        "currentDocument": { "exists": exists },
    });
    if let Some(mask) = mask {
        body["updateMask"] = json!({
            "fieldPaths": mask.iter().map(|name| quote_field_path(name)).collect::<Vec<_>>(),
        });
    }
    if !transforms.is_empty() {
        body["updateTransforms"] = Value::Array(transforms);
    }
    body
}

#[derive(Clone)]
pub struct FirestoreHttpClient {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
    id_token: Option<String>,
}

impl FirestoreHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, FolioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("folio/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config
                .firestore_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            id_token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database_path())
    }

    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.database_path(), collection, id)
    }

    /// REST URL of one document, with `collection` and `id` percent-encoded
    /// as path segments.
    pub fn document_url(&self, collection: &str, id: &str) -> Result<Url, FolioError> {
        let mut url = Url::parse(&self.documents_url())
            .map_err(|err| FolioError::StoreUnavailable(format!("invalid base URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| FolioError::StoreUnavailable("invalid base URL".to_string()))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn handle_status(response: Response) -> Result<Response, FolioError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Err(FolioError::StoreUnavailable(format!(
            "status {status}: {}",
            error_message(&body)
        )))
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, FolioError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(FolioError::StoreUnavailable(err.to_string()));
                }
            }
        }
    }

    fn commit(&self, write: Value) -> Result<Response, FolioError> {
        let url = format!("{}:commit", self.documents_url());
        self.request(Method::POST, &url)
            .json(&json!({ "writes": [write] }))
            .send()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))
    }
}

impl CatalogStore for FirestoreHttpClient {
    fn list_ordered(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, FolioError> {
        let url = format!("{}:runQuery", self.documents_url());
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{
                    "field": { "fieldPath": quote_field_path(order_by) },
                    "direction": "ASCENDING",
                }],
            }
        });
        debug!(collection, "firestore.runQuery");
        let response = self.send_with_retries(|| self.request(Method::POST, &url).json(&query))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?;
        parse_run_query(&body)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FolioError> {
        let url = self.document_url(collection, id)?;
        debug!(collection, id, "firestore.get");
        let response = self.send_with_retries(|| self.request(Method::GET, url.as_str()))?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| FolioError::StoreUnavailable(err.to_string()))?;
        parse_document(&body).map(Some)
    }

    fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, FolioError> {
        let id = new_document_id();
        let name = self.document_name(collection, &id);
        debug!(collection, id = %id, "firestore.commit create");
        let response = self.commit(build_write(&name, &write, None, false))?;
        Self::handle_status(response)?;
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), FolioError> {
        let name = self.document_name(collection, id);
        let mask = write.fields.keys().cloned().collect::<Vec<_>>();
        debug!(collection, id, fields = mask.len(), "firestore.commit update");
        let response = self.commit(build_write(&name, &write, Some(&mask), true))?;
        if response.status().as_u16() == 404 {
            return Err(FolioError::NotFound(id.to_string()));
        }
        Self::handle_status(response)?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), FolioError> {
        let url = self.document_url(collection, id)?;
        debug!(collection, id, "firestore.delete");
        let response = self.send_with_retries(|| self.request(Method::DELETE, url.as_str()))?;
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        Self::handle_status(response)?;
        Ok(())
    }
}

/// Pulls `error.message` out of a Google API error body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "request failed".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_paths_are_quoted_when_needed() {
        assert_eq!(quote_field_path("imageUrl"), "imageUrl");
        assert_eq!(quote_field_path("has space"), "`has space`");
        assert_eq!(quote_field_path("1st"), "`1st`");
    }

    #[test]
    fn integers_round_through_string_encoding() {
        let value = json_to_value(&json!(42));
        assert_eq!(value, FirestoreValue::IntegerValue("42".to_string()));
        assert_eq!(value_to_json(value), json!(42));
    }

    #[test]
    fn document_urls_encode_reserved_characters() {
        let config = ResolvedConfig {
            api_key: "key".to_string(),
            project_id: "demo".to_string(),
            collection: "projects".to_string(),
            firestore_base_url: None,
            request_timeout: Duration::from_secs(5),
            contact: None,
        };
        let client = FirestoreHttpClient::new(&config).unwrap();
        let url = client.document_url("projects", "a?b#c%d").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/projects/a%3Fb%23c%25d"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn non_finite_doubles_decode_as_null() {
        let value: FirestoreValue = serde_json::from_value(json!({ "doubleValue": "NaN" })).unwrap();
        assert_eq!(value_to_json(value), Value::Null);
        let value: FirestoreValue = serde_json::from_value(json!({ "doubleValue": 2.5 })).unwrap();
        assert_eq!(value_to_json(value), json!(2.5));
    }

    #[test]
    fn error_message_prefers_api_message() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "Missing or insufficient permissions.");
        assert_eq!(error_message(""), "request failed");
    }
}
