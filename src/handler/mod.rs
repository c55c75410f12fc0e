//! Request handling module
//!
//! Entry point for HTTP request processing: method validation, logical name
//! derivation, cache lookup, and response selection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Local;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};

use crate::assets::{AssetCache, AssetError};
use crate::config::AppState;
use crate::http::{self, etag};
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating what response selection needs
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub access_log: bool,
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = std::time::Instant::now();
    let method = req.method();
    let path = req.uri().path();
    let is_head = *method == Method::HEAD;

    // 1. Method policy: only GET and HEAD reach the asset cache
    if let Some(resp) = check_http_method(method, state.config.http.enable_cors) {
        return Ok(resp);
    }

    // 2. Log headers if enabled
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 3. Extract the conditional request header and dispatch
    let access_log = state.cached_access_log.load(Ordering::Relaxed);
    let ctx = RequestContext {
        path,
        is_head,
        if_none_match: header_value(&req, "if-none-match"),
        access_log,
    };

    let response = respond(&ctx, &state.cache).await;

    // 4. Emit the access log entry
    if access_log {
        let entry = AccessLogEntry {
            remote_addr: peer_addr.ip().to_string(),
            time: Local::now(),
            method: method.to_string(),
            path: path.to_string(),
            query: req.uri().query().map(ToString::to_string),
            http_version: http_version_str(req.version()).to_string(),
            status: response.status().as_u16(),
            body_bytes: content_length_of(&response),
            referer: header_value(&req, "referer"),
            user_agent: header_value(&req, "user-agent"),
            request_time_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Select a response for a validated GET/HEAD request
async fn respond(ctx: &RequestContext<'_>, cache: &AssetCache) -> Response<Full<Bytes>> {
    let name = logical_name(ctx.path);

    match cache.get(name).await {
        Ok(asset) => {
            if etag::check_etag_match(ctx.if_none_match.as_deref(), &asset.etag) {
                return http::build_304_response(&asset.etag);
            }
            if ctx.access_log {
                logger::log_response(&asset.name, asset.content.len());
            }
            http::build_asset_response(&asset, ctx.is_head)
        }
        Err(AssetError::NotFound(name)) => {
            logger::log_warning(&format!("Asset not found: {name}"));
            http::build_404_response()
        }
        Err(err @ AssetError::InvalidPath(_)) => {
            logger::log_warning(&format!("Rejected request path: {err}"));
            http::build_400_response(&err.to_string())
        }
    }
}

/// Map a request path to the logical asset name. The root path serves the
/// entry page.
fn logical_name(path: &str) -> &str {
    if path == "/" {
        "index.html"
    } else {
        path
    }
}

/// Check HTTP method and return an early response for anything other than
/// GET/HEAD
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn content_length_of(response: &Response<Full<Bytes>>) -> usize {
    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn http_version_str(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{CachePolicy, EmbeddedStore};
    use http_body_util::BodyExt;

    fn embedded_cache() -> AssetCache {
        AssetCache::new(Arc::new(EmbeddedStore), CachePolicy::default())
    }

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            is_head: false,
            if_none_match: None,
            access_log: false,
        }
    }

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn root_maps_to_the_entry_page() {
        assert_eq!(logical_name("/"), "index.html");
        assert_eq!(logical_name("/index.html"), "/index.html");
        assert_eq!(logical_name("/css/styles.css"), "/css/styles.css");
    }

    #[tokio::test]
    async fn root_and_entry_page_resolve_to_the_same_asset() {
        let cache = embedded_cache();

        let root = respond(&ctx("/"), &cache).await;
        let direct = respond(&ctx("/index.html"), &cache).await;

        assert_eq!(root.status(), 200);
        assert_eq!(direct.status(), 200);
        assert_eq!(
            root.headers().get("content-type"),
            direct.headers().get("content-type")
        );
        assert_eq!(body_of(root).await, body_of(direct).await);
    }

    #[tokio::test]
    async fn missing_assets_produce_404() {
        let cache = embedded_cache();
        let response = respond(&ctx("/nope.html"), &cache).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn traversal_paths_produce_400() {
        let cache = embedded_cache();
        let response = respond(&ctx("/../etc/passwd"), &cache).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn head_requests_get_headers_without_a_body() {
        let cache = embedded_cache();
        let response = respond(
            &RequestContext {
                path: "/index.html",
                is_head: true,
                if_none_match: None,
                access_log: false,
            },
            &cache,
        )
        .await;

        assert_eq!(response.status(), 200);
        assert!(response.headers().get("content-length").is_some());
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn matching_etag_produces_304() {
        let cache = embedded_cache();

        let first = respond(&ctx("/index.html"), &cache).await;
        let etag = first
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .unwrap();

        let second = respond(
            &RequestContext {
                path: "/index.html",
                is_head: false,
                if_none_match: Some(etag),
                access_log: false,
            },
            &cache,
        )
        .await;

        assert_eq!(second.status(), 304);
        assert!(body_of(second).await.is_empty());
    }
}
