//! DigitalOcean API client implementation.
//!
//! This module provides the HTTP client for the App Platform and Domains
//! endpoints of the DigitalOcean v2 REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::AppSpecification;
use crate::error::{PlatformError, Result};

use super::types::{
    ApiErrorBody, AppResponse, DomainRecord, DomainRecordsResponse, ListAppsResponse, RemoteApp,
    SpecRequest,
};
use super::{AppPlatform, DnsRecords};

/// DigitalOcean API base URL.
pub const DIGITALOCEAN_API_URL: &str = "https://api.digitalocean.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Apps requested per page.
const APPS_PER_PAGE: u32 = 100;

/// DigitalOcean API client.
#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    /// HTTP client.
    client: Client,
    /// API access token.
    token: String,
    /// Base URL without trailing slash.
    base_url: String,
}

impl DigitalOceanClient {
    /// Creates a new client for the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DIGITALOCEAN_API_URL)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PlatformError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
    }

    /// Sends a request and maps non-success statuses to errors.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        trace!("API responded with {status}");

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PlatformError::AuthenticationFailed {
                message: String::from("Invalid access token"),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body).map_or(body, |e| match e.id {
                Some(id) => format!("{id}: {}", e.message),
                None => e.message,
            });
            return Err(PlatformError::api_error(status.as_u16(), message).into());
        }

        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        response.json().await.map_err(|e| {
            PlatformError::invalid_response(format!("Failed to parse response: {e}")).into()
        })
    }

    async fn send_spec<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<RemoteApp> {
        let request = self.request(method, &self.url(path)).json(body);
        let response: AppResponse = self.execute_json(request).await?;
        Ok(response.app)
    }
}

#[async_trait]
impl AppPlatform for DigitalOceanClient {
    async fn list_apps(&self) -> Result<Vec<RemoteApp>> {
        debug!("Get apps running in DigitalOcean");

        let mut apps = Vec::new();
        let mut next = Some(self.url(&format!("/v2/apps?per_page={APPS_PER_PAGE}")));

        while let Some(url) = next {
            trace!("Fetching apps page {url}");
            let page: ListAppsResponse = self.execute_json(self.request(Method::GET, &url)).await?;
            next = page.next_page().map(str::to_string);
            apps.extend(page.apps);
        }

        Ok(apps)
    }

    async fn create_app(&self, spec: &AppSpecification) -> Result<RemoteApp> {
        debug!("Creating app {}", spec.name);
        self.send_spec(Method::POST, "/v2/apps", &SpecRequest { spec, app_id: None })
            .await
    }

    async fn update_app(&self, app_id: &str, spec: &AppSpecification) -> Result<RemoteApp> {
        debug!("Updating app {} ({app_id})", spec.name);
        self.send_spec(
            Method::PUT,
            &format!("/v2/apps/{app_id}"),
            &SpecRequest { spec, app_id: None },
        )
        .await
    }

    async fn delete_app(&self, app_id: &str) -> Result<()> {
        debug!("Deleting app {app_id}");
        let request = self.request(Method::DELETE, &self.url(&format!("/v2/apps/{app_id}")));
        self.execute(request).await?;
        Ok(())
    }

    async fn propose_app(&self, spec: &AppSpecification, app_id: Option<String>) -> Result<()> {
        debug!("Proposing app {}", spec.name);
        let body = SpecRequest {
            spec,
            app_id: app_id.as_deref(),
        };
        let request = self
            .request(Method::POST, &self.url("/v2/apps/propose"))
            .json(&body);
        self.execute(request).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsRecords for DigitalOceanClient {
    async fn cname_records(&self, zone: &str, name: &str) -> Result<Vec<DomainRecord>> {
        let request = self
            .request(Method::GET, &self.url(&format!("/v2/domains/{zone}/records")))
            .query(&[("type", "CNAME"), ("name", name)]);

        debug!("Looking up CNAME records for {name} in {zone}");
        let response: DomainRecordsResponse = self.execute_json(request).await?;

        Ok(response.domain_records)
    }

    async fn delete_record(&self, zone: &str, record_id: u64) -> Result<()> {
        let request = self.request(
            Method::DELETE,
            &self.url(&format!("/v2/domains/{zone}/records/{record_id}")),
        );
        self.execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::AppfileError;

    fn app_json(id: &str, name: &str) -> serde_json::Value {
        json!({"id": id, "spec": {"name": name}})
    }

    fn spec(name: &str) -> AppSpecification {
        AppSpecification {
            name: name.to_string(),
            ..AppSpecification::default()
        }
    }

    async fn client(server: &MockServer) -> DigitalOceanClient {
        DigitalOceanClient::with_base_url("secret", &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_list_apps_follows_pages() {
        let server = MockServer::start().await;
        let next = format!("{}/v2/apps?page=2&per_page=100", server.uri());

        Mock::given(method("GET"))
            .and(path("/v2/apps"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apps": [app_json("2", "second")],
                "links": {}
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/apps"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apps": [app_json("1", "first")],
                "links": {"pages": {"next": next}}
            })))
            .mount(&server)
            .await;

        let apps = client(&server).await.list_apps().await.unwrap();

        let names: Vec<&str> = apps.iter().map(RemoteApp::name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/apps"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).await.list_apps().await.unwrap_err();

        assert!(matches!(err, AppfileError::Platform(PlatformError::AuthenticationFailed { .. })));
    }

    #[tokio::test]
    async fn test_create_posts_spec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/apps"))
            .and(body_partial_json(json!({"spec": {"name": "sample"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"app": app_json("abc", "sample")})))
            .expect(1)
            .mount(&server)
            .await;

        let app = client(&server).await.create_app(&spec("sample")).await.unwrap();

        assert_eq!(app.id, "abc");
    }

    #[tokio::test]
    async fn test_update_and_delete_use_app_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/apps/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"app": app_json("abc", "sample")})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/apps/abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server).await;
        c.update_app("abc", &spec("sample")).await.unwrap();
        c.delete_app("abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_propose_rejection_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/apps/propose"))
            .and(body_partial_json(json!({"app_id": "abc"})))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "id": "unprocessable_entity",
                "message": "invalid instance size"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .propose_app(&spec("sample"), Some(String::from("abc")))
            .await
            .unwrap_err();

        match err {
            AppfileError::Platform(PlatformError::ApiRequestFailed { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "unprocessable_entity: invalid instance size");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cname_records_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/domains/example.com/records"))
            .and(query_param("type", "CNAME"))
            .and(query_param("name", "app.example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_records": [{"id": 7, "type": "CNAME", "name": "app", "data": "x."}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/domains/example.com/records/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server).await;
        let records = c.cname_records("example.com", "app.example.com").await.unwrap();
        assert_eq!(records.len(), 1);
        c.delete_record("example.com", records[0].id).await.unwrap();
    }

    #[tokio::test]
    async fn test_cname_records_keep_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/domains/example.com/records"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/domains/missing.com/records"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "id": "not_found",
                "message": "The resource you were accessing could not be found."
            })))
            .mount(&server)
            .await;

        let c = client(&server).await;

        let err = c.cname_records("example.com", "app.example.com").await.unwrap_err();
        assert!(matches!(err, AppfileError::Platform(PlatformError::AuthenticationFailed { .. })));

        let err = c.cname_records("missing.com", "app.missing.com").await.unwrap_err();
        assert!(matches!(
            err,
            AppfileError::Platform(PlatformError::ApiRequestFailed { status: 404, .. })
        ));
        assert!(err.to_string().contains("not_found"));
    }
}

