//! REST document store client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{collection_path, document_path, RemoteDocument, RemoteStore};
use crate::models::{ReportDocument, ReportDocumentPatch, ReportId};
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Remote store speaking a JSON document API.
///
/// `PUT` writes a full document, `PATCH` merges fields, `DELETE` removes and
/// `GET` reads a document or lists a collection.
#[derive(Clone)]
pub struct HttpDocumentStore {
    base_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for HttpDocumentStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpDocumentStore")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpDocumentStore {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client setup failed: {error}")))?;

        Ok(Self {
            base_url,
            auth_token: normalize_text_option(auth_token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the endpoint answers at all; any HTTP status counts as reachable
    pub async fn probe(&self) -> bool {
        match self.authorize(self.client.get(&self.base_url)).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Remote probe of {} failed: {}", self.base_url, error);
                false
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(self.authorize(request).send().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpDocumentStore {
    async fn set_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        document: &ReportDocument,
    ) -> Result<()> {
        let url = self.url(&document_path(uid, report_id));
        let response = self.send(self.client.put(url).json(document)).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn update_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        patch: &ReportDocumentPatch,
    ) -> Result<()> {
        let url = self.url(&document_path(uid, report_id));
        let response = self.send(self.client.patch(url).json(patch)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("remote document {report_id}")));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_document(&self, uid: &str, report_id: &ReportId) -> Result<()> {
        let url = self.url(&document_path(uid, report_id));
        let response = self.send(self.client.delete(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Remote document {} already absent", report_id);
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn get_document(
        &self,
        uid: &str,
        report_id: &ReportId,
    ) -> Result<Option<ReportDocument>> {
        let url = self.url(&document_path(uid, report_id));
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        Ok(Some(read_json(response).await?))
    }

    async fn list_documents(&self, uid: &str) -> Result<Vec<RemoteDocument>> {
        let url = self.url(&collection_path(uid));
        let request = self
            .client
            .get(url)
            .query(&[("orderBy", "createdAt"), ("direction", "desc")]);
        let response = ensure_success(self.send(request).await?).await?;
        let payload: DocumentList = read_json(response).await?;
        Ok(payload.documents)
    }
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<RemoteDocument>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote(parse_api_error(status, &body)))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|error| Error::Remote(format!("invalid response body: {error}")))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("remote URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "remote URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpDocumentStore {
        HttpDocumentStore::new(
            format!("{}/", server.uri()),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn document() -> ReportDocument {
        ReportDocument {
            title: "Pothole".into(),
            details: "Deep".into(),
            category: "Infrastructure".into(),
            location: "5th Ave".into(),
            created_at: Utc::now(),
            updated_at: None,
            has_media: false,
            media_count: 0,
            synced_at: Some(Utc::now()),
        }
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/v1/ ".to_string()).unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn parse_api_error_prefers_message() {
        assert_eq!(
            parse_api_error(
                StatusCode::FORBIDDEN,
                r#"{"message":"permission denied"}"#
            ),
            "permission denied (403)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            "HTTP 502"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let store =
            HttpDocumentStore::new("https://example.com", Some("secret".into()), Duration::from_secs(1))
                .unwrap();
        let debug = format!("{store:?}");
        assert!(!debug.contains("secret"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_document_puts_full_document() {
        let server = MockServer::start().await;
        let document = document();

        Mock::given(method("PUT"))
            .and(path("/users/u1/reports/r1"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(&document))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .set_document("u1", &ReportId::from("r1"), &document)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_treats_missing_document_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/users/u1/reports/r1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        client(&server)
            .delete_document("u1", &ReportId::from("r1"))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/u1/reports/r1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = client(&server)
            .update_document("u1", &ReportId::from("r1"), &ReportDocumentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_and_list_documents() {
        let server = MockServer::start().await;
        let document = document();

        Mock::given(method("GET"))
            .and(path("/users/u1/reports/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&document))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u1/reports/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u1/reports"))
            .and(query_param("orderBy", "createdAt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [{ "id": "r1", "data": &document }]
            })))
            .mount(&server)
            .await;

        let store = client(&server);
        assert_eq!(
            store
                .get_document("u1", &ReportId::from("r1"))
                .await
                .unwrap(),
            Some(document.clone())
        );
        assert_eq!(
            store
                .get_document("u1", &ReportId::from("missing"))
                .await
                .unwrap(),
            None
        );

        let listed = store.list_documents("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ReportId::from("r1"));
        assert_eq!(listed[0].data, document);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_errors_map_to_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "backend down" })),
            )
            .mount(&server)
            .await;

        let error = client(&server)
            .set_document("u1", &ReportId::from("r1"), &document())
            .await
            .unwrap_err();
        match error {
            Error::Remote(message) => assert_eq!(message, "backend down (500)"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_endpoint_is_remote_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpDocumentStore::new(
            format!("http://{address}"),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(!store.probe().await);
        let error = store
            .delete_document("u1", &ReportId::from("r1"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::RemoteUnavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_accepts_any_http_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(client(&server).probe().await);
    }
}
