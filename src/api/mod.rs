//! Action router module
//!
//! Entry point for gateway requests: maps a client-supplied action token
//! (plus optional query parameters) to a predefined read query and wraps the
//! result, or any failure, in the uniform response envelope. The router is
//! stateless; nothing survives past the response.

mod actions;
mod dispatch;
mod envelope;

pub use envelope::Envelope;

use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::storage::QueryExecutor;
use dispatch::{DispatchError, RequestContext};

/// Main entry point for HTTP request handling.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let referer = header_string(req.headers(), "referer");
    let user_agent = header_string(req.headers(), "user-agent");
    let http_version = version_label(req.version());

    let response = respond(&method, uri.query(), &state.storage).await;

    if state.cached_access_log.load(Ordering::Relaxed) {
        let mut entry = logger::AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            uri.path().to_string(),
        );
        entry.query = uri.query().map(ToString::to_string);
        entry.http_version = http_version;
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(
            response.body().size_hint().exact().unwrap_or(0),
        )
        .unwrap_or(usize::MAX);
        entry.referer = referer;
        entry.user_agent = user_agent;
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Produce the response for one request.
///
/// Separated from `handle_request` so the routing contract is testable
/// without a live hyper connection. Dispatch is keyed on the query component
/// only; the URL path does not participate.
async fn respond(
    method: &Method,
    query: Option<&str>,
    storage: &Arc<dyn QueryExecutor>,
) -> Response<Full<Bytes>> {
    // Preflight never reaches the dispatch table
    if method == Method::OPTIONS {
        return http::build_preflight_response();
    }

    let ctx = RequestContext::from_query(query);
    match dispatch::run(&ctx, storage).await {
        Ok(rows) => http::build_envelope_response(StatusCode::OK, &Envelope::success(rows)),
        Err(err) => {
            let (status, envelope) = translate_error(&err);
            http::build_envelope_response(status, &envelope)
        }
    }
}

/// Error-to-envelope translation, the single boundary where dispatch
/// failures become transport responses.
///
/// The missing-`action` case is the only validation failure surfaced as a
/// transport-level 400; unknown actions and missing action-specific
/// parameters stay at transport 200 with an envelope code of 400, matching
/// the observed contract of the original service.
fn translate_error(err: &DispatchError) -> (StatusCode, Envelope) {
    match err {
        DispatchError::MissingAction => (
            StatusCode::BAD_REQUEST,
            Envelope::error(400, "action parameter is required"),
        ),
        DispatchError::UnknownAction => (
            StatusCode::OK,
            Envelope::error(400, "Invalid action parameter"),
        ),
        DispatchError::MissingParam(param) => (
            StatusCode::OK,
            Envelope::error(400, format!("{param} is required")),
        ),
        DispatchError::Storage(fault) => {
            logger::log_error(&format!("Storage fault: {fault}"));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Envelope::error(500, format!("Server error: {fault}")),
            )
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> String {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Record, StorageError};
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Canned storage collaborator that records every call it receives.
    struct MockExecutor {
        rows: Vec<Record>,
        fault: Option<String>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl MockExecutor {
        fn returning(rows: Vec<Record>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                fault: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                rows: Vec::new(),
                fault: Some(message.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl QueryExecutor for MockExecutor {
        async fn execute(
            &self,
            sql: &str,
            params: &[String],
        ) -> Result<Vec<Record>, StorageError> {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            match &self.fault {
                Some(message) => Err(StorageError::Database(message.clone())),
                None => Ok(self.rows.clone()),
            }
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn options_short_circuits_before_dispatch() {
        let mock = MockExecutor::returning(vec![]);
        let storage: Arc<dyn QueryExecutor> = mock.clone();

        let response = respond(&Method::OPTIONS, Some("action=get_banners"), &storage).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "*"
        );
        assert_eq!(
            response.headers()["Access-Control-Allow-Methods"],
            "GET, POST, OPTIONS"
        );
        assert_eq!(
            response.headers()["Access-Control-Allow-Headers"],
            "Content-Type"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
        assert!(mock.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_action_is_a_transport_400() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::GET, None, &storage).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "action parameter is required", "data": null})
        );
    }

    #[tokio::test]
    async fn empty_action_value_is_a_transport_400() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::GET, Some("action="), &storage).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "action parameter is required", "data": null})
        );
    }

    #[tokio::test]
    async fn unknown_action_is_a_logical_error_inside_a_200() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::GET, Some("action=delete_everything"), &storage).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "Invalid action parameter", "data": null})
        );
    }

    #[tokio::test]
    async fn missing_category_id_is_a_logical_error_inside_a_200() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::GET, Some("action=get_category_products"), &storage).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "category_id is required", "data": null})
        );
    }

    #[tokio::test]
    async fn empty_category_id_never_reaches_storage() {
        let mock = MockExecutor::returning(vec![]);
        let storage: Arc<dyn QueryExecutor> = mock.clone();

        let response = respond(
            &Method::GET,
            Some("action=get_category_products&category_id="),
            &storage,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "category_id is required", "data": null})
        );
        assert!(mock.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_passes_rows_through_in_order() {
        let rows = vec![
            row(&[("id", json!(2)), ("title", json!("Sencha"))]),
            row(&[("id", json!(1)), ("title", json!("Oolong"))]),
        ];
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(rows);
        let response = respond(&Method::GET, Some("action=get_banners"), &storage).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            response.headers()["Content-Type"],
            "application/json; charset=utf-8"
        );

        let body = body_json(response).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "success");
        assert_eq!(body["data"][0]["title"], "Sencha");
        assert_eq!(body["data"][1]["title"], "Oolong");
    }

    #[tokio::test]
    async fn zero_rows_yields_an_empty_sequence_not_null() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::GET, Some("action=get_popular_products"), &storage).await;

        let body = body_json(response).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn category_id_binds_into_the_filtered_template() {
        let mock = MockExecutor::returning(vec![]);
        let storage: Arc<dyn QueryExecutor> = mock.clone();

        let response = respond(
            &Method::GET,
            Some("action=get_category_products&category_id=7"),
            &storage,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let calls = mock.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (sql, params) = &calls[0];
        assert_eq!(params, &vec!["7".to_string()]);
        assert!(sql.contains("category_id = ?"));
        assert!(sql.contains("status = 1"));
        assert!(sql.contains("ORDER BY sort_order ASC"));
    }

    #[tokio::test]
    async fn storage_fault_becomes_a_500_envelope() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::failing("database unreachable");
        let response = respond(&Method::GET, Some("action=get_stories"), &storage).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            body_json(response).await,
            json!({
                "code": 500,
                "message": "Server error: database unreachable",
                "data": null
            })
        );
    }

    #[tokio::test]
    async fn post_dispatches_like_get() {
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(vec![]);
        let response = respond(&Method::POST, Some("action=get_categories"), &storage).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["code"], 0);
    }

    #[tokio::test]
    async fn repeated_reads_are_byte_identical() {
        let rows = vec![row(&[("id", json!(1)), ("title", json!("Oolong"))])];
        let storage: Arc<dyn QueryExecutor> = MockExecutor::returning(rows);

        let first = respond(&Method::GET, Some("action=get_banners"), &storage).await;
        let second = respond(&Method::GET, Some("action=get_banners"), &storage).await;

        let first_bytes = first.into_body().collect().await.unwrap().to_bytes();
        let second_bytes = second.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(first_bytes, second_bytes);
    }
}
