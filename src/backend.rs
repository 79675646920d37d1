use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::model::{
    DependencyStatus, DownloadAccepted, DownloadRequest, ErrorBody, FormatKind, InfoRequest,
    JobProgress, VideoMetadata,
};

/// Calls the controller makes against the download backend.
///
/// `HttpBackend` talks to the real server; tests substitute a scripted fake.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /check-dependencies`
    async fn check_dependencies(&self) -> Result<DependencyStatus>;

    /// `POST /get-info`
    async fn get_info(&self, url: &str) -> Result<VideoMetadata>;

    /// `POST /download`
    ///
    /// Returns the opaque job id to poll.
    async fn start_download(
        &self,
        url: &str,
        kind: FormatKind,
        format_id: &str,
        title: &str,
    ) -> Result<String>;

    /// `GET /progress/{id}`
    ///
    /// The body is interpreted whatever the HTTP status; only transport and
    /// decoding failures are errors.
    async fn progress(&self, job_id: &str) -> Result<JobProgress>;

    /// `GET /download-file/{id}`
    async fn download_file(&self, job_id: &str) -> Result<Vec<u8>>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create an HttpBackend with a reqwest Client.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Build the HTTP client from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?, config.backend_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of the browser-facing file route for a finished job.
    pub fn file_url(&self, job_id: &str) -> String {
        self.url(&format!("/download-file/{}", job_id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        decode(&body)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn check_dependencies(&self) -> Result<DependencyStatus> {
        let response = self.client.get(self.url("/check-dependencies")).send().await?;
        Self::handle_response(response).await
    }

    async fn get_info(&self, url: &str) -> Result<VideoMetadata> {
        debug!(url, "requesting video info");
        let response = self
            .client
            .post(self.url("/get-info"))
            .json(&InfoRequest { url })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn start_download(
        &self,
        url: &str,
        kind: FormatKind,
        format_id: &str,
        title: &str,
    ) -> Result<String> {
        let request = DownloadRequest {
            url,
            kind,
            format_id,
            title,
        };
        let response = self
            .client
            .post(self.url("/download"))
            .json(&request)
            .send()
            .await?;
        let accepted: DownloadAccepted = Self::handle_response(response).await?;
        Ok(accepted.download_id)
    }

    async fn progress(&self, job_id: &str) -> Result<JobProgress> {
        let response = self
            .client
            .get(self.url(&format!("/progress/{}", job_id)))
            .send()
            .await?;
        let body = response.text().await?;
        decode(&body)
    }

    async fn download_file(&self, job_id: &str) -> Result<Vec<u8>> {
        let response = self.client.get(self.file_url(job_id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode a JSON body, keeping the path of the offending field.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|e| ClientError::Json {
        path: e.path().to_string(),
        source: e.into_inner(),
    })
}

/// Map a non-2xx body to an error, preferring the backend's own text.
pub fn error_from_body(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(message),
        }) if !message.trim().is_empty() => ClientError::Backend(message),
        _ => ClientError::Status(status),
    }
}
