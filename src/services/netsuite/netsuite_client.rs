// NetSuite SuiteQL client using Token-Based Authentication (OAuth 1.0a,
// RFC 5849) with HMAC-SHA256 signatures. Every call is signed with a fresh
// nonce and timestamp; a signature is never valid for replay.

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Rows fetched per SuiteQL request during pagination.
const PAGE_SIZE: i64 = 1000;

#[derive(Error, Debug)]
pub enum NetSuiteError {
    /// Non-2xx from the SuiteQL endpoint. Fatal for the call; no automatic
    /// retry — callers decide whether and when to retry.
    #[error("remote query failed ({status}): {body}")]
    RemoteQuery { status: StatusCode, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NetSuiteError>;

#[derive(Debug, Clone)]
pub struct NetSuiteConfig {
    pub account_id: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_id: String,
    pub token_secret: String,
    /// Defaults to account_id when unset.
    pub realm: Option<String>,
}

impl NetSuiteConfig {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("account_id", &self.account_id),
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("token_id", &self.token_id),
            ("token_secret", &self.token_secret),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(NetSuiteError::Config(format!("{} is required", name)));
            }
        }
        Ok(())
    }
}

/// One page of SuiteQL results. Rows come back as flat column→value maps.
#[derive(Debug, Deserialize)]
pub struct SuiteQlPage {
    pub items: Vec<Map<String, Value>>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(rename = "totalResults")]
    pub total_results: Option<i64>,
}

pub struct NetSuiteClient {
    config: NetSuiteConfig,
    base_url: String,
    http_client: Client,
}

impl NetSuiteClient {
    pub fn new(config: NetSuiteConfig) -> Result<Self> {
        let base_url = format!("https://{}.suitetalk.api.netsuite.com", config.account_id);
        Self::with_base_url(config, base_url)
    }

    /// Point the client at an explicit base URL (mock servers in tests).
    pub fn with_base_url(config: NetSuiteConfig, base_url: String) -> Result<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(NetSuiteError::Network)?;

        Ok(Self {
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Execute one SuiteQL query page. Non-2xx responses are fatal for the
    /// call and carry the status and response body back to the caller.
    pub async fn suiteql(&self, q: &str, limit: i64, offset: i64) -> Result<SuiteQlPage> {
        let url = format!("{}/services/rest/query/v1/suiteql", self.base_url);
        let query_params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];

        let auth_header = self.oauth_header("POST", &url, &query_params)?;

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Prefer", "transient")
            .query(&query_params)
            .json(&json!({ "q": q }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetSuiteError::RemoteQuery { status, body });
        }

        Ok(response.json().await?)
    }

    /// Run a query to exhaustion, following `hasMore` across pages.
    pub async fn suiteql_all(&self, q: &str) -> Result<Vec<Map<String, Value>>> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.suiteql(q, PAGE_SIZE, offset).await?;
            let fetched = page.items.len() as i64;
            rows.extend(page.items);

            if !page.has_more || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        Ok(rows)
    }

    // ------------------------------------------------------------------------
    // OAuth 1.0a signing
    // ------------------------------------------------------------------------

    fn oauth_header(&self, method: &str, url: &str, query_params: &[(&str, String)]) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| NetSuiteError::Signing("system clock before epoch".to_string()))?
            .as_secs()
            .to_string();

        let nonce = uuid::Uuid::new_v4().simple().to_string();

        let oauth_params = vec![
            ("oauth_consumer_key", self.config.consumer_key.as_str()),
            ("oauth_token", self.config.token_id.as_str()),
            ("oauth_signature_method", "HMAC-SHA256"),
            ("oauth_timestamp", &timestamp),
            ("oauth_nonce", &nonce),
            ("oauth_version", "1.0"),
        ];

        let signature = self.sign(method, url, &oauth_params, query_params)?;

        let realm = self
            .config
            .realm
            .as_deref()
            .unwrap_or(&self.config.account_id);

        let mut header = format!("OAuth realm=\"{}\"", realm);
        for (key, value) in oauth_params
            .iter()
            .chain(std::iter::once(&("oauth_signature", signature.as_str())))
        {
            header.push_str(&format!(",{}=\"{}\"", key, percent_encode(value)));
        }

        Ok(header)
    }

    /// HMAC-SHA256 over the signature base string: method, URL, and the
    /// sorted union of OAuth and query parameters.
    fn sign(
        &self,
        method: &str,
        url: &str,
        oauth_params: &[(&str, &str)],
        query_params: &[(&str, String)],
    ) -> Result<String> {
        let mut all_params: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in query_params {
            all_params.push((k.to_string(), v.clone()));
        }
        all_params.sort();

        let param_string = all_params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            percent_encode(method),
            percent_encode(url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.config.consumer_secret),
            percent_encode(&self.config.token_secret)
        );

        let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
            .map_err(|_| NetSuiteError::Signing("invalid HMAC key".to_string()))?;
        mac.update(base_string.as_bytes());

        Ok(base64::encode(mac.finalize().into_bytes()))
    }
}

fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NetSuiteConfig {
        NetSuiteConfig {
            account_id: "123456".to_string(),
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            token_id: "tid".to_string(),
            token_secret: "ts".to_string(),
            realm: None,
        }
    }

    #[test]
    fn config_requires_all_credentials() {
        let mut cfg = config();
        cfg.token_secret = String::new();
        assert!(cfg.validate().is_err());
        assert!(config().validate().is_ok());
    }

    #[test]
    fn base_url_is_derived_from_account() {
        let client = NetSuiteClient::new(config()).unwrap();
        assert_eq!(client.base_url, "https://123456.suitetalk.api.netsuite.com");
    }

    #[test]
    fn signatures_differ_per_call() {
        // Fresh nonce + timestamp per header means no two headers repeat.
        let client = NetSuiteClient::new(config()).unwrap();
        let url = "https://123456.suitetalk.api.netsuite.com/services/rest/query/v1/suiteql";
        let params = vec![("limit", "10".to_string())];
        let a = client.oauth_header("POST", url, &params).unwrap();
        let b = client.oauth_header("POST", url, &params).unwrap();
        assert_ne!(a, b);
        assert!(a.contains("oauth_signature_method=\"HMAC-SHA256\""));
        assert!(a.starts_with("OAuth realm=\"123456\""));
    }

    #[test]
    fn percent_encoding_is_strict() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("a&b=c"), "a%26b%3Dc");
    }
}
