//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! body limits, route matching and access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::pages::{self, PageRequest};
use crate::config::AppState;
use crate::http::{self, BodyError, FormData, FormError};
use crate::logger::{self, AccessLogEntry};
use crate::routing;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let started = Instant::now();
    let mut entry = state.access_log_enabled().then(|| {
        let mut e = AccessLogEntry::from_request(peer, req.method(), req.uri(), req.version());
        e.referer = header_string(&req, REFERER.as_str());
        e.user_agent = header_string(&req, USER_AGENT.as_str());
        e
    });

    let mut response = route_request(req, &state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if let Some(ref mut e) = entry {
        let size = usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0);
        e.finish(response.status().as_u16(), size, started);
        logger::log_access(e, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method()) {
        return resp;
    }

    // 2. Match route on the decoded path before touching the body
    let Some(path) = routing::decode_path(req.uri().path()) else {
        logger::log_debug(&format!("Undecodable path {}", req.uri().path()));
        return http::build_404_response();
    };
    let Some(route) = routing::match_route(&path) else {
        logger::log_debug(&format!("No route for {path}"));
        return http::build_404_response();
    };

    // 3. Check declared body size
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return resp;
    }

    logger::log_headers_count(req.headers().len());

    let (parts, body) = req.into_parts();
    let is_head = parts.method == Method::HEAD;
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    // 4. Decode form fields from query string and body
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match http::read_body(body, limit).await {
        Ok(bytes) => bytes,
        Err(BodyError::TooLarge) => {
            logger::log_error(&format!("Request body too large (max: {max_body_size})"));
            return http::build_413_response();
        }
        Err(BodyError::Read(e)) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return http::build_400_response("unreadable request body");
        }
    };
    let query = parts.uri.query();
    let form = match http::decode_form(query, content_type, body).await {
        Ok(form) => form,
        Err(FormError::Unsupported(ct)) if route.writes_page() => {
            logger::log_warning(&format!("{} refused body of type {ct}", route.name()));
            return http::build_415_response();
        }
        // Pages that only read ignore a body they cannot decode
        Err(FormError::Unsupported(_)) => FormData::parse(query, &[]),
        Err(FormError::Malformed(e)) => {
            logger::log_warning(&format!("Malformed multipart body: {e}"));
            return http::build_400_response("malformed multipart body");
        }
    };

    let page_req = PageRequest {
        is_head,
        ..PageRequest::with_form(&path, form)
    };

    pages::dispatch(route, &page_req, state).await
}

/// Wiki forms post, links get; anything else is refused
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD | Method::POST => None,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    match content_length.to_str().ok()?.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        _ => None,
    }
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::render::Renderer;
    use crate::wiki::{Page, PageStore};
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn state(dir: &TempDir, max_body_size: u64) -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist-wiki-config").unwrap();
        config.http.max_body_size = max_body_size;
        config.logging.access_log = false;
        let store = PageStore::new(dir.path(), ".txt");
        Arc::new(AppState::with_parts(&config, store, Box::new(Renderer::builtin().unwrap())))
    }

    fn form_request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_save_then_get_view() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);

        let req = form_request(Method::POST, "/save/Welcome", "body=Hello");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()[SERVER], "flatwiki");

        let req = form_request(Method::GET, "/view/Welcome", "");
        let resp = handle_request(req, state, None).await.unwrap();
        assert_eq!(resp.status(), 200);
        let html = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&html).contains("Hello"));
    }

    #[tokio::test]
    async fn test_get_with_query_form_behaves_like_post() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);

        let req = form_request(Method::GET, "/create/?title=Test&body=X", "");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 302);
        assert_eq!(state.store.load("Test").await.unwrap().body, b"X");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let dir = TempDir::new().expect("temp dir");
        let req = form_request(Method::DELETE, "/view/Welcome", "");
        let resp = handle_request(req, state(&dir, 1024), None).await.unwrap();
        assert_eq!(resp.status(), 405);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_413_and_not_saved() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 8);
        let req = form_request(Method::POST, "/save/Big", "body=far+too+long+for+the+limit");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 413);
        assert!(state.store.load("Big").await.is_err());
    }

    fn typed_request(uri: &str, content_type: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_save_stores_body_field() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        state.store.save(&Page::new("Welcome", "precious")).await.unwrap();

        let req = typed_request(
            "/save/Welcome",
            "multipart/form-data; boundary=X",
            "--X\r\nContent-Disposition: form-data; name=\"body\"\r\n\r\nHello\r\n--X--\r\n",
        );
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 302);
        assert_eq!(state.store.load("Welcome").await.unwrap().body, b"Hello");
    }

    #[tokio::test]
    async fn test_multipart_create_reads_title_and_body() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        let req = typed_request(
            "/create/",
            "multipart/form-data; boundary=X",
            "--X\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nNotes\r\n\
             --X\r\nContent-Disposition: form-data; name=\"body\"\r\n\r\nfrom a form\r\n--X--\r\n",
        );
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()["Location"], "/view/Notes");
        assert_eq!(state.store.load("Notes").await.unwrap().body, b"from a form");
    }

    #[tokio::test]
    async fn test_unsupported_body_type_leaves_page_unchanged() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        state.store.save(&Page::new("Welcome", "precious")).await.unwrap();

        let req = typed_request("/save/Welcome", "application/json", r#"{"body":"Hello"}"#);
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 415);
        assert_eq!(state.store.load("Welcome").await.unwrap().body, b"precious");

        let req = typed_request("/create/?title=Json", "text/plain", "body=x");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 415);
        assert!(state.store.load("Json").await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_body_on_view_is_ignored() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        state.store.save(&Page::new("Welcome", "Hello")).await.unwrap();

        let req = typed_request("/view/Welcome", "application/json", "{}");
        let resp = handle_request(req, state, None).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn test_malformed_multipart_is_400_and_not_saved() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        let req = typed_request("/save/Broken", "multipart/form-data", "body=x");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 400);
        assert!(state.store.load("Broken").await.is_err());
    }

    #[tokio::test]
    async fn test_percent_encoded_title_is_decoded() {
        let dir = TempDir::new().expect("temp dir");
        let state = state(&dir, 1024);
        state.store.save(&Page::new("Foo", "decoded")).await.unwrap();

        let req = form_request(Method::GET, "/view/%46oo", "");
        let resp = handle_request(req, Arc::clone(&state), None).await.unwrap();
        assert_eq!(resp.status(), 200);
        let html = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&html).contains("decoded"));

        let req = form_request(Method::GET, "/view/a%2F..%2Fetc", "");
        let resp = handle_request(req, state, None).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = TempDir::new().expect("temp dir");
        let req = form_request(Method::GET, "/unknown/path", "");
        let resp = handle_request(req, state(&dir, 1024), None).await.unwrap();
        assert_eq!(resp.status(), 404);
    }
}
