//! Admin client for Wiremock based stub services
//!
//! Talks to the `__admin` REST surface: stub mappings are registered from
//! JSON files or values, and the request journal can be queried to assert on
//! what the system under test sent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::error::{HarnessError, HarnessResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct WiremockController {
    url: String,
    mappings_url: Url,
    mappings_reset_url: Url,
    requests_url: Url,
    client: reqwest::Client,
}

impl WiremockController {
    pub fn new(url: &str) -> HarnessResult<Self> {
        let mut base = Url::parse(url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            url: url.to_string(),
            mappings_url: base.join("__admin/mappings")?,
            mappings_reset_url: base.join("__admin/mappings/reset")?,
            requests_url: base.join("__admin/requests")?,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register every `*.json` stub found directly inside `dir`
    ///
    /// # Returns
    /// Stub uuid per mapping file
    pub async fn set_mapping_from_dir(&self, dir: &Path) -> HarnessResult<BTreeMap<PathBuf, String>> {
        debug!("📂 Setting {} mappings from directory {}", self.url, dir.display());
        if !dir.is_dir() {
            return Err(HarnessError::wiremock(
                &self.url,
                format!("'{}' is not a valid dir", dir.display()),
            ));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        self.set_mapping_from_files(&files).await
    }

    pub async fn set_mapping_from_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> HarnessResult<BTreeMap<PathBuf, String>> {
        let mut stubs = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            let uuid = self.set_mapping_from_file(path).await?;
            stubs.insert(path.to_path_buf(), uuid);
        }
        Ok(stubs)
    }

    pub async fn set_mapping_from_file(&self, path: &Path) -> HarnessResult<String> {
        debug!("📄 Setting {} mapping from file {}", self.url, path.display());
        let content = std::fs::read_to_string(path)?;
        let mapping: Value = serde_json::from_str(&content)?;
        self.set_mapping_from_json(&mapping).await
    }

    /// Register one stub mapping and return its uuid
    pub async fn set_mapping_from_json(&self, mapping: &Value) -> HarnessResult<String> {
        debug!("🧩 Setting {} mapping: {}", self.url, mapping);
        let body: Value = match self.post_json(&self.mappings_url, mapping).await {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Failed setting {} mapping: {}", self.url, e);
                return Err(HarnessError::wiremock(
                    &self.url,
                    format!("failed setting mapping {mapping}: {e}"),
                ));
            }
        };

        body.get("uuid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::wiremock(&self.url, "mapping response carries no uuid"))
    }

    pub async fn reset_mapping(&self) -> HarnessResult<()> {
        debug!("🔄 Resetting {} mappings", self.url);
        let result = self
            .client
            .post(self.mappings_reset_url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("❌ Failed resetting {} mappings: {}", self.url, e);
                Err(HarnessError::wiremock(&self.url, format!("failed resetting mappings: {e}")))
            }
        }
    }

    /// Every request the stub service has received since the last reset
    pub async fn get_request_journal(&self) -> HarnessResult<Vec<Value>> {
        let response = self.client.get(self.requests_url.clone()).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(HarnessError::wiremock(
                &self.url,
                format!("request journal returned {status}: {text}"),
            ));
        }

        let mut body: Value = serde_json::from_str(&text)?;
        match body.get_mut("requests").map(Value::take) {
            Some(Value::Array(requests)) => Ok(requests),
            _ => Err(HarnessError::wiremock(&self.url, "request journal carries no requests list")),
        }
    }

    /// Journal entries filtered by request url and by the stub that matched them
    pub async fn get_matching_requests(
        &self,
        inner_url: Option<&str>,
        stub_id: Option<&str>,
    ) -> HarnessResult<Vec<Value>> {
        let journal = self.get_request_journal().await?;
        Ok(journal
            .into_iter()
            .filter(|entry| matches_request(entry, inner_url, stub_id))
            .collect())
    }

    pub async fn delete_request_journal(&self) -> HarnessResult<()> {
        debug!("🧹 Deleting {} request journal", self.url);
        self.client
            .delete(self.requests_url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn post_json(&self, url: &Url, body: &Value) -> reqwest::Result<Value> {
        self.client
            .post(url.clone())
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn matches_request(entry: &Value, inner_url: Option<&str>, stub_id: Option<&str>) -> bool {
    if let Some(inner_url) = inner_url {
        if entry["request"]["url"].as_str() != Some(inner_url) {
            return false;
        }
    }
    if let Some(stub_id) = stub_id {
        let matched = entry["wasMatched"].as_bool().unwrap_or(false);
        if !matched || entry["stubMapping"]["uuid"].as_str() != Some(stub_id) {
            return false;
        }
    }
    true
}
