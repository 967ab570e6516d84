//! Blob Storage
//!
//! 트레일러 파일을 HTTP blob API에 업로드한다.
//! `PUT {api_url}/{pathname}` (bearer token) -> `{ url, pathname }`
//!
//! pathname의 각 segment는 URL에 넣을 때 percent-encoding 된다.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::BlobConfig;

/// 업로드 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlob {
    pub url: String,
    pub pathname: String,
}

pub struct BlobStorage {
    api_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl BlobStorage {
    pub fn new(config: &BlobConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build blob storage HTTP client")?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http,
        })
    }

    /// 공개 접근 가능한 blob으로 업로드
    pub async fn put_public(
        &self,
        pathname: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<StoredBlob> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("BLOB_READ_WRITE_TOKEN not configured"))?;

        let url = self.upload_url(pathname)?;

        let mut request = self
            .http
            .put(url)
            .bearer_auth(token)
            .header("x-access", "public")
            .body(bytes);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response = request.send().await.context("blob upload request failed")?;
        if !response.status().is_success() {
            bail!("blob upload failed with status {}", response.status());
        }

        let blob: StoredBlob = response
            .json()
            .await
            .context("malformed blob upload response")?;

        tracing::info!(pathname = %blob.pathname, url = %blob.url, "blob uploaded");
        Ok(blob)
    }

    /// `{api_url}/{pathname}`. `?`, `#`, `%` 등은 segment 안에서 인코딩
    fn upload_url(&self, pathname: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid BLOB_API_URL {}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("BLOB_API_URL cannot be a base URL"))?
            .pop_if_empty()
            .extend(pathname.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

/// 트레일러 저장 경로: `trailers/{film_id}/{file_name}`
///
/// 파일명에서 경로 구분자와 제어 문자를 제거한다.
pub fn trailer_path(film_id: i64, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let name = if sanitized.is_empty() { "trailer" } else { sanitized };
    format!("trailers/{}/{}", film_id, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_path() {
        assert_eq!(trailer_path(3, "teaser.mp4"), "trailers/3/teaser.mp4");
        assert_eq!(trailer_path(3, "../../etc/passwd"), "trailers/3/_.._etc_passwd");
        assert_eq!(trailer_path(3, ""), "trailers/3/trailer");
    }

    #[test]
    fn test_upload_url_encodes_segments() {
        let storage = BlobStorage::new(&BlobConfig {
            api_url: "https://blob.example/api/".to_string(),
            token: None,
        })
        .unwrap();

        let url = storage
            .upload_url(&trailer_path(3, "cut?v=2#final 100%.mp4"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://blob.example/api/trailers/3/cut%3Fv=2%23final%20100%25.mp4"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[tokio::test]
    async fn test_upload_without_token_fails() {
        let storage = BlobStorage::new(&BlobConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            token: None,
        })
        .unwrap();
        let result = storage.put_public("trailers/1/a.mp4", None, vec![1, 2, 3]).await;
        assert!(result.is_err());
    }
}
