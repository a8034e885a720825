// ABOUTME: HTTP adapter implementing RemoteBackend against a hosted document service.
// ABOUTME: Maps collection/document operations onto REST calls and HTTP failures onto RemoteError.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::remote::{Document, RemoteBackend, RemoteError};

/// Remote document store reached over HTTP.
///
/// Documents live at `{base}/v1/collections/{collection}/documents/{key}`.
/// Inserts POST to the collection and receive `{"id": ...}`; equality
/// queries GET the collection with `field` and `value` parameters and
/// receive `{"documents": [{"id": ..., "data": {...}}]}`.
pub struct HttpRemote {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct Inserted {
    id: String,
}

#[derive(Deserialize)]
struct QueryResult {
    documents: Vec<QueryHit>,
}

#[derive(Deserialize)]
struct QueryHit {
    id: String,
    data: Document,
}

impl HttpRemote {
    pub fn new(base: Url, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            token,
        }
    }

    fn documents_url(&self, collection: &str, key: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RemoteError::Backend(format!("remote URL cannot be a base: {}", self.base))
            })?;
            segments
                .pop_if_empty()
                .extend(["v1", "collections", collection, "documents"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                RemoteError::PermissionDenied(format!("{} {}: {}", status, url, body))
            }
            StatusCode::NOT_FOUND => RemoteError::NotFound(url),
            _ => RemoteError::Backend(format!("{} {}: {}", status, url, body)),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, RemoteError> {
        let url = self.documents_url(collection, None)?;
        let response = self.send(self.request(Method::POST, url).json(&doc)).await?;
        let inserted: Inserted = Self::read_json(response).await?;
        Ok(inserted.id)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, RemoteError> {
        let url = self.documents_url(collection, Some(key))?;
        match self.send(self.request(Method::GET, url)).await {
            Ok(response) => Self::read_json(response).await.map(Some),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), RemoteError> {
        let url = self.documents_url(collection, Some(key))?;
        self.send(self.request(Method::PUT, url).json(&doc)).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), RemoteError> {
        let url = self.documents_url(collection, Some(key))?;
        self.send(self.request(Method::PATCH, url).json(&fields)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError> {
        let url = self.documents_url(collection, Some(key))?;
        match self.send(self.request(Method::DELETE, url)).await {
            Ok(_) | Err(RemoteError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, RemoteError> {
        let mut url = self.documents_url(collection, None)?;
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        url.query_pairs_mut()
            .append_pair("field", field)
            .append_pair("value", &value);

        let response = self.send(self.request(Method::GET, url)).await?;
        let result: QueryResult = Self::read_json(response).await?;
        Ok(result
            .documents
            .into_iter()
            .map(|hit| (hit.id, hit.data))
            .collect())
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Json;

    type Docs = Arc<Mutex<HashMap<String, Document>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer secret")
    }

    async fn create_doc(
        State(docs): State<Docs>,
        headers: HeaderMap,
        Path(_collection): Path<String>,
        Json(doc): Json<Document>,
    ) -> impl IntoResponse {
        if !authorized(&headers) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({"error": "no token"}))).into_response();
        }
        let mut docs = docs.lock().unwrap();
        let id = format!("remote-{}", docs.len() + 1);
        docs.insert(id.clone(), doc);
        Json(json!({ "id": id })).into_response()
    }

    async fn query_docs(
        State(docs): State<Docs>,
        Path(_collection): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let docs = docs.lock().unwrap();
        let field = params.get("field").cloned().unwrap_or_default();
        let value = params.get("value").cloned().unwrap_or_default();
        let hits: Vec<Value> = docs
            .iter()
            .filter(|(_, d)| d.get(&field).and_then(|v| v.as_str()) == Some(value.as_str()))
            .map(|(id, d)| json!({ "id": id, "data": d }))
            .collect();
        Json(json!({ "documents": hits }))
    }

    async fn get_doc(
        State(docs): State<Docs>,
        Path((_collection, key)): Path<(String, String)>,
    ) -> impl IntoResponse {
        match docs.lock().unwrap().get(&key) {
            Some(doc) => Json(doc.clone()).into_response(),
            None => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn put_doc(
        State(docs): State<Docs>,
        Path((_collection, key)): Path<(String, String)>,
        Json(doc): Json<Document>,
    ) -> impl IntoResponse {
        docs.lock().unwrap().insert(key, doc);
        AxumStatus::NO_CONTENT
    }

    async fn patch_doc(
        State(docs): State<Docs>,
        Path((_collection, key)): Path<(String, String)>,
        Json(fields): Json<Document>,
    ) -> impl IntoResponse {
        match docs.lock().unwrap().get_mut(&key) {
            Some(doc) => {
                doc.extend(fields);
                AxumStatus::NO_CONTENT
            }
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn delete_doc(
        State(docs): State<Docs>,
        Path((_collection, key)): Path<(String, String)>,
    ) -> impl IntoResponse {
        match docs.lock().unwrap().remove(&key) {
            Some(_) => AxumStatus::NO_CONTENT,
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn forbidden() -> impl IntoResponse {
        (AxumStatus::FORBIDDEN, "rules")
    }

    async fn broken() -> impl IntoResponse {
        (AxumStatus::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn spawn_stub() -> (Url, Docs) {
        let docs: Docs = Arc::default();
        let app = Router::new()
            .route(
                "/v1/collections/{collection}/documents",
                get(query_docs).post(create_doc),
            )
            .route(
                "/v1/collections/{collection}/documents/{key}",
                get(get_doc).put(put_doc).patch(patch_doc).delete(delete_doc),
            )
            .route("/v1/collections/locked/documents/{key}", get(forbidden))
            .route("/v1/collections/flaky/documents/{key}", get(broken))
            .with_state(docs.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (Url::parse(&format!("http://{}/", addr)).unwrap(), docs)
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn builds_document_urls_under_base_path() {
        let remote = HttpRemote::new(Url::parse("http://db.example/api/").unwrap(), None);
        let url = remote.documents_url("learning-paths", Some("a b")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://db.example/api/v1/collections/learning-paths/documents/a%20b"
        );
    }

    #[tokio::test]
    async fn document_lifecycle_over_http() {
        let (base, _docs) = spawn_stub().await;
        let remote = HttpRemote::new(base, Some("secret".to_string()));

        let key = remote
            .insert("learning-paths", doc(json!({"userId": "u1", "title": "Rust"})))
            .await
            .unwrap();
        assert_eq!(key, "remote-1");

        remote
            .update("learning-paths", &key, doc(json!({"title": "Rust Basics"})))
            .await
            .unwrap();
        let fetched = remote.get("learning-paths", &key).await.unwrap().unwrap();
        assert_eq!(fetched["title"], "Rust Basics");
        assert_eq!(fetched["userId"], "u1");

        let found = remote
            .query_eq("learning-paths", "userId", &Value::from("u1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, key);

        remote.delete("learning-paths", &key).await.unwrap();
        assert!(remote.get("learning-paths", &key).await.unwrap().is_none());
        remote.delete("learning-paths", &key).await.unwrap();
    }

    #[tokio::test]
    async fn set_by_natural_key() {
        let (base, docs) = spawn_stub().await;
        let remote = HttpRemote::new(base, None);

        remote
            .set("user-settings", "u1", doc(json!({"userId": "u1", "theme": "dark"})))
            .await
            .unwrap();
        assert_eq!(docs.lock().unwrap()["u1"]["theme"], "dark");
    }

    #[tokio::test]
    async fn maps_http_failures_to_remote_errors() {
        let (base, _docs) = spawn_stub().await;
        let remote = HttpRemote::new(base, None);

        assert!(matches!(
            remote.insert("learning-paths", Document::new()).await,
            Err(RemoteError::PermissionDenied(_))
        ));
        assert!(matches!(
            remote.get("locked", "x").await,
            Err(RemoteError::PermissionDenied(_))
        ));
        assert!(matches!(
            remote.get("flaky", "x").await,
            Err(RemoteError::Backend(_))
        ));
        assert!(matches!(
            remote.update("learning-paths", "missing", Document::new()).await,
            Err(RemoteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = HttpRemote::new(Url::parse(&format!("http://{}/", addr)).unwrap(), None);
        assert!(matches!(
            remote.get("learning-paths", "a").await,
            Err(RemoteError::Network(_))
        ));
    }
}
