//! Cloud Storage JSON API client.
//!
//! Only the five calls the harness needs are implemented:
//!
//! ```text
//! POST   {base}/storage/v1/b?project={project}                body {"name": bucket}
//! POST   {base}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={object}
//! GET    {base}/storage/v1/b/{bucket}/o[?pageToken=…]
//! DELETE {base}/storage/v1/b/{bucket}/o/{object}
//! DELETE {base}/storage/v1/b/{bucket}
//! ```
//!
//! All connection details come from [`StorageConfig`]; pointing `base_url` at
//! a local emulator (or a mock server) works without code changes.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use crate::config::StorageConfig;
use crate::storage::{
    delete_listed, object_name_for, DeleteSummary, ObjectStore, StorageError,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ObjectList {
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

/// [`ObjectStore`] backed by the Cloud Storage JSON API.
pub struct GcsStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl GcsStore {
    /// Build a client from storage config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.  A default client is used if the builder fails.
    pub fn from_config(config: &StorageConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| StorageError::Request(format!("invalid base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Request("base_url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer token only when it is a non-empty string.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.config.access_token.as_deref() {
            Some(token) if !token.is_empty() => req.bearer_auth(token),
            _ => req,
        }
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, StorageError> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        log::debug!("storage: {what} -> HTTP {status}");
        match status {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(what.to_string())),
            StatusCode::CONFLICT => Err(StorageError::Conflict(what.to_string())),
            _ => Err(StorageError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut url = self.url(&["storage", "v1", "b"])?;
        if let Some(project) = self.config.project.as_deref() {
            url.query_pairs_mut().append_pair("project", project);
        }

        let body = serde_json::json!({ "name": bucket });
        self.send(self.client.post(url).json(&body), &format!("bucket {bucket}"))
            .await?;
        log::debug!("storage: created bucket {bucket}");
        Ok(())
    }

    async fn upload(&self, bucket: &str, local: &Path) -> Result<String, StorageError> {
        let object = object_name_for(local)?;
        let bytes = tokio::fs::read(local).await.map_err(|e| StorageError::Io {
            path: local.display().to_string(),
            message: e.to_string(),
        })?;

        let mut url = self.url(&["upload", "storage", "v1", "b", bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &object);

        let size = bytes.len();
        let req = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.send(req, &format!("bucket {bucket}")).await?;
        log::debug!("storage: uploaded {object} ({size} bytes) to {bucket}");
        Ok(object)
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["storage", "v1", "b", bucket, "o"])?;
            if let Some(token) = page_token.as_deref() {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let response = self
                .send(self.client.get(url), &format!("bucket {bucket}"))
                .await?;
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| StorageError::Parse(e.to_string()))?;

            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        force: bool,
    ) -> Result<DeleteSummary, StorageError> {
        let names = self.list_objects(bucket).await?;
        delete_listed(names, force, |name| async move {
            let url = self.url(&["storage", "v1", "b", bucket, "o", name.as_str()])?;
            self.send(self.client.delete(url), &format!("object {bucket}/{name}"))
                .await
                .map(|_| ())
        })
        .await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let url = self.url(&["storage", "v1", "b", bucket])?;
        match self
            .send(self.client.delete(url), &format!("bucket {bucket}"))
            .await
        {
            Ok(_) => Ok(()),
            Err(StorageError::Conflict(_)) => Err(StorageError::BucketNotEmpty(bucket.to_string())),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, token: Option<&str>) -> GcsStore {
        GcsStore::from_config(&StorageConfig {
            base_url: server.uri(),
            project: Some("test-project".into()),
            access_token: token.map(str::to_string),
            timeout_secs: 5,
            ..StorageConfig::default()
        })
    }

    #[tokio::test]
    async fn create_bucket_posts_name_and_project() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/b"))
            .and(query_param("project", "test-project"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_json(serde_json::json!({ "name": "fixtures-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "fixtures-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server, Some("ya29.test"))
            .create_bucket("fixtures-1")
            .await
            .expect("create");
    }

    #[tokio::test]
    async fn create_bucket_conflict_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let err = store_for(&server, None)
            .create_bucket("taken")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn upload_uses_base_filename_as_object_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("audio.raw");
        std::fs::write(&file, b"\x00\x01\x02\x03").expect("write fixture");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/fixtures-1/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "audio.raw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "audio.raw"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let object = store_for(&server, None)
            .upload("fixtures-1", &file)
            .await
            .expect("upload");
        assert_eq!(object, "audio.raw");
    }

    #[tokio::test]
    async fn upload_of_missing_file_never_hits_the_network() {
        let server = MockServer::start().await;
        let err = store_for(&server, None)
            .upload("fixtures-1", Path::new("/definitely/not/here.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/fixtures-1/o"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "name": "Google_Gnome.wav" }]
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/fixtures-1/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "name": "audio.raw" }],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let names = store_for(&server, None)
            .list_objects("fixtures-1")
            .await
            .expect("list");
        assert_eq!(names, vec!["audio.raw".to_string(), "Google_Gnome.wav".to_string()]);
    }

    #[tokio::test]
    async fn delete_objects_on_empty_bucket_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/fixtures-1/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "storage#objects"
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, None);
        for _ in 0..2 {
            let summary = store.delete_objects("fixtures-1", true).await.expect("delete");
            assert_eq!(summary, DeleteSummary::default());
        }
    }

    #[tokio::test]
    async fn delete_objects_removes_each_listed_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/fixtures-1/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "name": "audio.raw" }, { "name": "Google_Gnome.wav" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/b/fixtures-1/o/audio.raw"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/b/fixtures-1/o/Google_Gnome.wav"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store_for(&server, None)
            .delete_objects("fixtures-1", true)
            .await
            .unwrap_err();
        match err {
            StorageError::Partial(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("Google_Gnome.wav"));
            }
            other => panic!("expected Partial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_bucket_conflict_means_not_empty() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/b/fixtures-1"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let err = store_for(&server, None)
            .delete_bucket("fixtures-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BucketNotEmpty(ref b) if b == "fixtures-1"));
    }

    #[tokio::test]
    async fn missing_bucket_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/b/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = store_for(&server, None).delete_bucket("gone").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
