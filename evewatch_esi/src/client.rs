use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use evewatch_core::Timestamp;
use reqwest::{
    Method, Url,
    header::{self, HeaderMap, HeaderValue},
    redirect,
};
use serde::de::DeserializeOwned;

use crate::{
    cache::CacheInfo,
    config::EsiConfig,
    errors::{EsiError, EsiResult},
    request::{EsiRequest, Language},
    response::{EsiResponse, EsiStatus},
};

/// If the remaining error budget drops to this level or below, new
/// requests should be held until the error limit window resets.
const ERROR_THRESHOLD: i32 = 8;

/// Never trust a reset countdown further out than this; the server has
/// been observed sending values that would freeze the client for hours.
const MAX_ERROR_RESET_SECS: i32 = 120;

const MAX_REDIRECTS: usize = 3;

/// Issues requests against ESI and classifies the outcomes. The error
/// limit advertised by the server is tracked but requests are never
/// automatically retried or delayed; callers consult
/// [`RequestClient::is_error_limit_exceeded`] before issuing more calls.
///
/// Every failure mode is reported through the [`EsiResponse`] envelope;
/// the query methods themselves never fail.
pub struct RequestClient {
    http: reqwest::Client,
    base_url: Url,
    language: Language,
    /// Remaining error budget as last reported by the server.
    error_count: AtomicI32,
    /// Epoch seconds when the error limit window resets.
    error_count_refresh: AtomicI64,
}

impl RequestClient {
    pub fn new(config: &EsiConfig) -> EsiResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip,deflate;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_CHARSET,
            HeaderValue::from_static("ISO-8859-1,utf-8;q=0.8,*;q=0.7"),
        );

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| EsiError::InvalidUrl(err.to_string()))?;

        Ok(Self {
            http,
            base_url,
            language: config.language,
            error_count: AtomicI32::new(ERROR_THRESHOLD),
            error_count_refresh: AtomicI64::new(0),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, request: &EsiRequest) -> EsiResponse<T> {
        self.query(Method::GET, request, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        request: &EsiRequest,
        body: String,
    ) -> EsiResponse<T> {
        self.query(Method::POST, request, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        request: &EsiRequest,
        body: String,
    ) -> EsiResponse<T> {
        self.query(Method::PUT, request, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, request: &EsiRequest) -> EsiResponse<T> {
        self.query(Method::DELETE, request, None).await
    }

    /// True while the last reported error budget is at or below the
    /// threshold and the reset window has not yet elapsed. Deliberately
    /// conjunctive: once the reset second passes the predicate releases
    /// even if no newer headers have been observed.
    pub fn is_error_limit_exceeded(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) <= ERROR_THRESHOLD
            && self.error_count_refresh.load(Ordering::Relaxed) > Timestamp::now().as_epoch_secs()
    }

    async fn query<T: DeserializeOwned>(
        &self,
        method: Method,
        request: &EsiRequest,
        body: Option<String>,
    ) -> EsiResponse<T> {
        let url = match request.url(&self.base_url, self.language) {
            Ok(url) => url,
            Err(err) => return EsiResponse::failure_with(EsiStatus::Error, err),
        };
        log::trace!("{method} {url}");

        let mut builder = self.http.request(method, url);
        if let Some(cache_info) = &request.cache_info {
            builder = cache_info.apply_to(builder);
        }
        if let Some(body) = body {
            builder = builder
                .header(header::CONTENT_TYPE, request.content_type.media_type())
                .body(body);
        }

        match builder.send().await {
            Ok(response) => self.handle_response(response).await,
            Err(err) => {
                // Connect failures, timeouts, and cancellations all land here.
                let err = EsiError::from(err);
                log::debug!(
                    "transport failure for {}: {}",
                    request.endpoint,
                    err.display_chain()
                );
                EsiResponse::failure_with(EsiStatus::NetworkError, err)
            }
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> EsiResponse<T> {
        let received = Timestamp::now();
        let headers = response.headers();

        // Error limit headers are last-writer-wins; a missing or malformed
        // header leaves the previous observation in place.
        if let Some(remaining) = int_header(headers, "x-esi-error-limit-remain") {
            self.error_count.store(remaining, Ordering::Relaxed);
        }
        if let Some(reset_secs) = int_header(headers, "x-esi-error-limit-reset") {
            let reset_at = received.as_epoch_secs() + i64::from(reset_secs.min(MAX_ERROR_RESET_SECS));
            self.error_count_refresh.store(reset_at, Ordering::Relaxed);
        }

        let status = EsiStatus::from_http(response.status());
        if status != EsiStatus::Ok {
            log::debug!("esi response {} -> {status:?}", response.status());
            return EsiResponse::failure(status);
        }

        let pages = int_header(headers, "x-pages")
            .map(|pages| pages.max(1) as u32)
            .unwrap_or(1);
        let server_time = text_header(headers, header::DATE.as_str())
            .and_then(|date| Timestamp::parse_rfc2822(&date))
            .unwrap_or(received);
        let etag = text_header(headers, header::ETAG.as_str());
        let expires = text_header(headers, header::EXPIRES.as_str())
            .and_then(|expires| Timestamp::parse_rfc2822(&expires))
            .unwrap_or(received);
        let cache_info = CacheInfo::new(etag.as_deref(), expires);

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return EsiResponse::failure_with(EsiStatus::NetworkError, err.into()),
        };
        match serde_json::from_slice::<T>(&body) {
            Ok(payload) => EsiResponse::success(payload, cache_info, pages, server_time),
            // A body that fails to parse downgrades an OK response.
            Err(err) => EsiResponse::failure_with(EsiStatus::Error, err.into()),
        }
    }
}

/// Reads a non-negative integer header, taking the last valid value when
/// the header is repeated.
fn int_header(headers: &HeaderMap, name: &str) -> Option<i32> {
    let mut result = None;
    for raw in headers.get_all(name) {
        if let Ok(text) = raw.to_str() {
            if let Ok(value) = text.trim().parse::<i32>() {
                if value >= 0 {
                    result = Some(value);
                }
            }
        }
    }
    result
}

fn text_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|raw| raw.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use evewatch_core::Timestamp;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::Value;

    use super::RequestClient;
    use crate::{
        cache::CacheInfo,
        config::EsiConfig,
        endpoint::Endpoint,
        errors::EsiError,
        request::EsiRequest,
        response::{EsiResponse, EsiStatus},
    };

    fn client_for(server: &ServerGuard) -> RequestClient {
        let config = EsiConfig {
            base_url: server.url(),
            ..EsiConfig::default()
        };
        RequestClient::new(&config).expect("client should build")
    }

    #[tokio::test]
    async fn ok_response_parses_payload_and_cache_metadata() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/contracts/public/10000002/")
            .match_header("user-agent", "evewatch/0.1")
            .with_status(200)
            .with_header("etag", "\"abc123\"")
            .with_header("expires", "Sat, 01 Jan 2028 00:00:00 GMT")
            .with_header("x-pages", "3")
            .with_body(r#"[{"contract_id": 1}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let request = EsiRequest::new(Endpoint::ContractsPublic).path("10000002");
        let response: EsiResponse<Value> = client.get(&request).await;

        mock.assert_async().await;
        assert!(response.is_ok());
        assert_eq!(response.pages(), 3);
        let cache = response.cache_info().expect("cache info on ok");
        assert_eq!(cache.etag(), "\"abc123\"");
        assert_eq!(
            cache.expires(),
            Timestamp::parse_rfc2822("Sat, 01 Jan 2028 00:00:00 GMT").expect("valid date")
        );
        let payload = response.payload().expect("payload on ok");
        assert_eq!(payload[0]["contract_id"], 1);
    }

    #[tokio::test]
    async fn not_modified_is_no_new_data_without_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/universe/names/")
            .match_header("if-none-match", "\"abc123\"")
            .match_header("if-modified-since", Matcher::Any)
            .with_status(304)
            .create_async()
            .await;

        let client = client_for(&server);
        let cache = CacheInfo::new(
            Some("\"abc123\""),
            Timestamp::from_epoch_secs(1_700_000_000).expect("valid epoch"),
        );
        let request = EsiRequest::new(Endpoint::UniverseNames).cache_info(cache);
        let response: EsiResponse<Value> = client.get(&request).await;

        mock.assert_async().await;
        assert_eq!(response.status(), EsiStatus::NoNewData);
        assert!(response.payload().is_none());
        assert!(response.cache_info().is_none());
    }

    #[tokio::test]
    async fn server_error_is_classified() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/universe/names/")
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server);
        let response: EsiResponse<Value> =
            client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        assert_eq!(response.status(), EsiStatus::ServerError);
    }

    #[tokio::test]
    async fn error_limit_exceeded_updates_budget_and_predicate() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/universe/names/")
            .with_status(420)
            .with_header("x-esi-error-limit-remain", "0")
            .with_header("x-esi-error-limit-reset", "60")
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(!client.is_error_limit_exceeded());
        let response: EsiResponse<Value> =
            client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        assert_eq!(response.status(), EsiStatus::ErrorCountExceeded);
        assert!(client.is_error_limit_exceeded());
    }

    #[tokio::test]
    async fn error_limit_reset_is_clamped() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/universe/names/")
            .with_status(420)
            .with_header("x-esi-error-limit-remain", "0")
            .with_header("x-esi-error-limit-reset", "86400")
            .create_async()
            .await;

        let client = client_for(&server);
        let _: EsiResponse<Value> = client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        let refresh = client.error_count_refresh.load(Ordering::Relaxed);
        assert!(refresh - Timestamp::now().as_epoch_secs() <= 120);
        assert!(client.is_error_limit_exceeded());
    }

    #[tokio::test]
    async fn missing_budget_headers_leave_prior_state() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/universe/names/")
            .with_status(420)
            .with_header("x-esi-error-limit-remain", "2")
            .with_header("x-esi-error-limit-reset", "90")
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/contracts/public/1/")
            .with_status(200)
            .with_header("x-esi-error-limit-reset", "garbage")
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server);
        let _: EsiResponse<Value> = client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        assert_eq!(client.error_count.load(Ordering::Relaxed), 2);
        let refresh = client.error_count_refresh.load(Ordering::Relaxed);

        let _: EsiResponse<Value> = client
            .get(&EsiRequest::new(Endpoint::ContractsPublic).path("1"))
            .await;
        assert_eq!(client.error_count.load(Ordering::Relaxed), 2);
        assert_eq!(client.error_count_refresh.load(Ordering::Relaxed), refresh);
    }

    #[tokio::test]
    async fn malformed_body_downgrades_ok_to_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/universe/names/")
            .with_status(200)
            .with_body("this is not json")
            .create_async()
            .await;

        let client = client_for(&server);
        let response: EsiResponse<Value> =
            client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        assert_eq!(response.status(), EsiStatus::Error);
        assert!(matches!(response.error(), Some(EsiError::Deserialize(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let config = EsiConfig {
            base_url: "http://127.0.0.1:1".to_owned(),
            ..EsiConfig::default()
        };
        let client = RequestClient::new(&config).expect("client should build");
        let response: EsiResponse<Value> =
            client.get(&EsiRequest::new(Endpoint::UniverseNames)).await;
        assert_eq!(response.status(), EsiStatus::NetworkError);
        assert!(matches!(response.error(), Some(EsiError::Transport(_))));
    }

    #[tokio::test]
    async fn post_sends_body_with_json_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/universe/names/")
            .match_header("content-type", "application/json")
            .match_body("[96325318]")
            .with_status(200)
            .with_body(r#"[{"id": 96325318, "name": "Peter Han", "category": "character"}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let response: EsiResponse<Value> = client
            .post(&EsiRequest::new(Endpoint::UniverseNames), "[96325318]".to_owned())
            .await;
        mock.assert_async().await;
        assert!(response.is_ok());
    }
}
