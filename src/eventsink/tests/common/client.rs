use bytes::Bytes;
use eventsink::record::CapturedRecord;
use reqwest::{header::CONTENT_TYPE, StatusCode};

/// Test driver for a running recorder
pub struct Client {
    inner: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(inner: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            inner,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn capture(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: impl Into<reqwest::Body>,
    ) -> anyhow::Result<StatusCode> {
        let mut request = self.inner.post(self.url(path)).body(body);

        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        Ok(request.send().await?.status())
    }

    /// Returns the raw `/count` body
    pub async fn count(&self) -> anyhow::Result<String> {
        let response = self.inner.get(self.url("/count")).send().await?;
        anyhow::ensure!(response.status().is_success(), "count failed: {}", response.status());

        Ok(response.text().await?)
    }

    pub async fn dump(&self) -> anyhow::Result<Vec<CapturedRecord>> {
        self.dump_at("/").await
    }

    pub async fn dump_at(&self, path: &str) -> anyhow::Result<Vec<CapturedRecord>> {
        let response = self.inner.get(self.url(path)).send().await?;
        anyhow::ensure!(response.status().is_success(), "dump failed: {}", response.status());

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .ok_or_else(|| anyhow::anyhow!("dump response has no content type"))?
            .to_str()?
            .to_string();
        let body: Bytes = response.bytes().await?;

        Ok(eventsink::retrieve::decode_dump(&content_type, body).await?)
    }

    pub async fn reset(&self) -> anyhow::Result<StatusCode> {
        Ok(self.inner.delete(self.url("/")).send().await?.status())
    }

    pub async fn send(&self, method: reqwest::Method, path: &str) -> anyhow::Result<reqwest::Response> {
        Ok(self.inner.request(method, self.url(path)).send().await?)
    }
}
