//! REST client core.
//!
//! Every call goes through [`ApiClient::request_value`]:
//!
//!   offline? ──yes──▶ notify(danger), Err(Offline), nothing sent
//!      │no
//!      ▼
//!   attempt ──timeout──▶ notify(warning), Err(Timeout)
//!      │
//!      ├─ transport error ──▶ retry after base×n while budget remains
//!      ├─ non-2xx ──────────▶ Err(Http{status, body}) (caller decides messaging)
//!      └─ 2xx ──────────────▶ decoded JSON
//!
//! Retries are invisible to the caller: one future, one final outcome.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::envelope;
use crate::error::ApiError;
use crate::notify::{LogNotifier, Notifier, Severity};
use crate::protocol::*;
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, HttpTransport, Method, RawResponse, Transport};

pub const OFFLINE_MESSAGE: &str = "You are offline. Check your connection to the server.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. The server may be busy.";

/// Shared online/offline flag. Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct Connectivity(Arc<AtomicBool>);

impl Connectivity {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns true when the flag actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        self.0.swap(online, Ordering::AcqRel) != online
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ApiClient<T: Transport = HttpTransport> {
    transport: Arc<T>,
    base_url: String,
    api_root: String,
    timeout: Duration,
    retry: RetryPolicy,
    connectivity: Connectivity,
    notifier: Arc<dyn Notifier>,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: self.base_url.clone(),
            api_root: self.api_root.clone(),
            timeout: self.timeout,
            retry: self.retry,
            connectivity: self.connectivity.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl ApiClient<HttpTransport> {
    pub fn new(server: &ServerConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, server, notifier))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, server: &ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transport: Arc::new(transport),
            base_url: server.base_url.trim_end_matches('/').to_string(),
            api_root: server.api_root(),
            timeout: server.request_timeout(),
            retry: RetryPolicy::new(server.max_retries, server.retry_base_delay()),
            connectivity: Connectivity::new(),
            notifier,
        }
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Same server and connectivity flag, but one attempt per call and
    /// failures only reach the log. For background writes such as progress
    /// saves.
    pub fn best_effort(&self) -> Self {
        Self {
            retry: RetryPolicy::new(0, self.retry.base_delay()),
            notifier: Arc::new(LogNotifier),
            ..self.clone()
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_root, endpoint)
    }

    // ── Core ────────────────────────────────────────────────────────────────

    /// Issues `method endpoint` under the API prefix and returns the decoded
    /// JSON body (`Null` for an empty 2xx body).
    pub async fn request_value(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.send_url(method, self.url(endpoint), body).await
    }

    async fn send_url(&self, method: Method, url: String, body: Option<Value>) -> Result<Value, ApiError> {
        if !self.connectivity.is_online() {
            self.notifier.notify(OFFLINE_MESSAGE, Severity::Danger, None);
            return Err(ApiError::Offline);
        }

        let mut retries = 0;
        loop {
            let request = ApiRequest {
                method,
                url: url.clone(),
                body: body.clone(),
            };
            let outcome = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
                Err(_) => {
                    warn!("{} {} timed out after {:?}", method.as_str(), url, self.timeout);
                    self.notifier.notify(TIMEOUT_MESSAGE, Severity::Warning, None);
                    return Err(ApiError::Timeout(self.timeout));
                }
                Ok(Err(e)) => Err(ApiError::Network(e.0)),
                Ok(Ok(resp)) => decode_response(resp),
            };

            match outcome {
                Err(e) if e.is_retryable() => match self.retry.next_delay(retries) {
                    Some(delay) => {
                        retries += 1;
                        debug!(
                            "{} {} failed ({}), retry {}/{} in {:?}",
                            method.as_str(),
                            url,
                            e,
                            retries,
                            self.retry.max_retries(),
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!("{} {} failed after {} retries: {}", method.as_str(), url, retries, e);
                        return Err(e);
                    }
                },
                other => return other,
            }
        }
    }

    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<R, ApiError> {
        let value = self.request_value(method, endpoint, body).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// List endpoint accessor: accepts a bare array or `{fallback_key: [...]}`.
    pub async fn get_array<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        fallback_key: &str,
    ) -> Result<Vec<R>, ApiError> {
        let value = self.request_value(Method::Get, endpoint, None).await?;
        envelope::normalize_list(value, fallback_key)
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| ApiError::Decode(e.to_string())))
            .collect()
    }

    async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        self.request(Method::Get, endpoint, None).await
    }

    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.request(method, endpoint, Some(body)).await
    }

    // ── Library ─────────────────────────────────────────────────────────────

    pub async fn list_library(&self) -> Result<Vec<MediaItem>, ApiError> {
        self.get_array("/library", "items").await
    }

    pub async fn media(&self, id: MediaId) -> Result<MediaDetails, ApiError> {
        self.get(&format!("/library/{}", id)).await
    }

    pub async fn media_details(&self, id: MediaId) -> Result<MediaDetails, ApiError> {
        self.get(&format!("/library/{}/details", id)).await
    }

    /// Full details, falling back to the plain item (with episodes) when the
    /// enriched endpoint fails server-side. Offline and timeout are not retried
    /// through the fallback.
    pub async fn load_details(&self, id: MediaId) -> Result<MediaDetails, ApiError> {
        match self.media_details(id).await {
            Err(e @ (ApiError::Http { .. } | ApiError::Decode(_))) => {
                warn!("details for media {} unavailable ({}), using basic item", id, e);
                self.media(id).await
            }
            other => other,
        }
    }

    pub async fn episodes(&self, id: MediaId) -> Result<Vec<Episode>, ApiError> {
        self.get_array(&format!("/library/{}/episodes", id), "episodes").await
    }

    pub async fn scan_library(&self) -> Result<ScanReport, ApiError> {
        self.request(Method::Post, "/library/scan", None).await
    }

    /// Removes the item and its files on disk.
    pub async fn delete_media(&self, id: MediaId) -> Result<Ack, ApiError> {
        self.request(Method::Delete, &format!("/library/{}?delete_files=true", id), None)
            .await
    }

    // ── Transfers ───────────────────────────────────────────────────────────

    pub async fn transfers(&self) -> Result<Vec<Transfer>, ApiError> {
        self.get_array("/torrents", "torrents").await
    }

    pub async fn transfer(&self, hash: &str) -> Result<Transfer, ApiError> {
        self.get(&format!("/torrents/{}", hash)).await
    }

    pub async fn transfer_stats(&self) -> Result<TransferStats, ApiError> {
        self.get("/torrents/stats").await
    }

    pub async fn add_magnet(&self, magnet_link: &str, save_path: Option<String>) -> Result<Ack, ApiError> {
        let magnet_link = validate_magnet(magnet_link)?;
        let body = AddTransferRequest {
            magnet_link: magnet_link.to_string(),
            save_path,
        };
        self.send_json(Method::Post, "/torrents", &body).await
    }

    pub async fn pause_transfer(&self, hash: &str) -> Result<Ack, ApiError> {
        self.request(Method::Post, &format!("/torrents/{}/pause", hash), None)
            .await
    }

    pub async fn resume_transfer(&self, hash: &str) -> Result<Ack, ApiError> {
        self.request(Method::Post, &format!("/torrents/{}/resume", hash), None)
            .await
    }

    pub async fn remove_transfer(&self, hash: &str, delete_files: bool) -> Result<Ack, ApiError> {
        let endpoint = if delete_files {
            format!("/torrents/{}?delete_files=true", hash)
        } else {
            format!("/torrents/{}", hash)
        };
        self.request(Method::Delete, &endpoint, None).await
    }

    // ── Transcode jobs ──────────────────────────────────────────────────────

    pub async fn jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.get_array("/transcode/jobs", "jobs").await
    }

    pub async fn job(&self, id: JobId) -> Result<Job, ApiError> {
        self.get(&format!("/transcode/jobs/{}", id)).await
    }

    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        if request.source_path.trim().is_empty() {
            return Err(ApiError::InvalidRequest("source path is empty".into()));
        }
        self.send_json(Method::Post, "/transcode/jobs", request).await
    }

    pub async fn queue_status(&self) -> Result<QueueStatus, ApiError> {
        self.get("/transcode/jobs/status").await
    }

    pub async fn cancel_job(&self, id: JobId) -> Result<Ack, ApiError> {
        self.request(Method::Delete, &format!("/transcode/jobs/{}", id), None)
            .await
    }

    /// Returns how many finished jobs the server removed.
    pub async fn clear_finished_jobs(&self) -> Result<u64, ApiError> {
        let cleared: ClearedCount = self
            .request(Method::Delete, "/transcode/jobs/finished", None)
            .await?;
        Ok(cleared.cleared)
    }

    pub async fn restart_job(&self, id: JobId) -> Result<Ack, ApiError> {
        self.request(Method::Post, &format!("/transcode/jobs/{}/restart", id), None)
            .await
    }

    pub async fn retry_job(&self, id: JobId) -> Result<Ack, ApiError> {
        self.request(Method::Post, &format!("/transcode/jobs/{}/retry", id), None)
            .await
    }

    // ── Playback progress ───────────────────────────────────────────────────

    pub async fn progress(
        &self,
        media_id: MediaId,
        episode_id: Option<EpisodeId>,
    ) -> Result<PlaybackPosition, ApiError> {
        self.get(&progress_endpoint(media_id, episode_id)).await
    }

    pub async fn save_progress(
        &self,
        media_id: MediaId,
        update: &ProgressUpdate,
    ) -> Result<PlaybackPosition, ApiError> {
        self.send_json(Method::Post, &format!("/progress/{}", media_id), update)
            .await
    }

    pub async fn clear_progress(&self, media_id: MediaId, episode_id: Option<EpisodeId>) -> Result<Ack, ApiError> {
        self.request(Method::Delete, &progress_endpoint(media_id, episode_id), None)
            .await
    }

    // ── Settings & status ───────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<Settings, ApiError> {
        let map: BTreeMap<String, String> = self.get("/settings").await?;
        Ok(Settings::from_map(&map))
    }

    pub async fn update_settings(&self, settings: &Settings) -> Result<Ack, ApiError> {
        let body = SettingsUpdate {
            settings: settings.to_map(),
        };
        self.send_json(Method::Put, "/settings", &body).await
    }

    pub async fn status(&self) -> Result<ServiceStatus, ApiError> {
        self.get("/status").await
    }

    /// Liveness endpoint; served at the server root, outside the API prefix.
    pub async fn health(&self) -> Result<Health, ApiError> {
        let url = format!("{}/health", self.base_url);
        let value = self.send_url(Method::Get, url, None).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn stream_url(&self, media_id: MediaId, episode_id: Option<EpisodeId>) -> String {
        match episode_id {
            Some(ep) => self.url(&format!("/stream/{}/episode/{}", media_id, ep)),
            None => self.url(&format!("/stream/{}", media_id)),
        }
    }
}

fn progress_endpoint(media_id: MediaId, episode_id: Option<EpisodeId>) -> String {
    match episode_id {
        Some(ep) => format!("/progress/{}?episode_id={}", media_id, ep),
        None => format!("/progress/{}", media_id),
    }
}

/// Trimmed link when it uses the `magnet:` scheme.
pub fn validate_magnet(link: &str) -> Result<&str, ApiError> {
    let link = link.trim();
    if link.starts_with("magnet:") {
        Ok(link)
    } else {
        Err(ApiError::InvalidRequest(
            "Invalid magnet link: must start with 'magnet:'".to_string(),
        ))
    }
}

fn decode_response(resp: RawResponse) -> Result<Value, ApiError> {
    if !resp.is_success() {
        return Err(ApiError::Http {
            status: resp.status,
            body: resp.body.unwrap_or(resp.status_line),
        });
    }
    let Some(body) = resp.body else {
        return Err(ApiError::Network("response body could not be read".to_string()));
    };
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
