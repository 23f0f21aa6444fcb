//! HTTP transport implementation.
//!
//! Every resource route is mounted on one axum [`Router`]. The entity id is
//! extracted as `Path<u64>`, protected routes sit behind [`auth_guard`] and
//! handler results are turned into responses by the `IntoResponse` impls
//! at the bottom of this file.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Path, Request, State,
        multipart::MultipartError, rejection::PathRejection,
    },
    handler::Handler as _,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter, get},
};
use http_body_util::LengthLimitError;
use serde_json::json;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use super::{HttpConfig, TransportError};
use crate::core::StoreServer;
use crate::core::dispatch::{
    ApiError, ApiResult, Outcome, RequestBody, RequestContext, Route, UploadPart,
};
use crate::core::error::{Error, Result};
use crate::core::security::Credentials;
use crate::domains::store::EntityId;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
struct AppState {
    server: StoreServer,
    max_body_bytes: usize,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Run the HTTP transport until Ctrl+C.
    pub async fn run(self, server: StoreServer) -> Result<()> {
        let addr = self.address();
        let app = build_router(server, &self.config)?;

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (CORS {})", addr, cors_status);
        info!("  → Service info: GET /");
        info!("  → Health:       GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the axum application for a server.
pub fn build_router(server: StoreServer, config: &HttpConfig) -> Result<Router> {
    let routes = server.routes().clone();
    router_with_routes(server, config, routes.routes())
}

fn router_with_routes(
    server: StoreServer,
    config: &HttpConfig,
    routes: &[Route],
) -> Result<Router> {
    let state = AppState {
        server,
        max_body_bytes: config.max_body_bytes,
    };

    let mut endpoints: BTreeMap<&str, MethodRouter<AppState>> = BTreeMap::new();
    let mut seen = HashSet::new();
    for route in routes {
        if !seen.insert(route.to_string()) {
            return Err(Error::config(format!("route {route} registered twice")));
        }

        let endpoint = endpoints
            .remove(route.path.as_str())
            .unwrap_or_else(MethodRouter::new);
        endpoints.insert(route.path.as_str(), mount(endpoint, route, &state)?);
    }

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check));
    for (path, endpoint) in endpoints {
        app = app.route(path, endpoint);
    }

    // Must come after every route: it only applies to routes already added.
    let mut app = app
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(config.max_body_bytes)),
        );

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);
        app = app.layer(cors);
    }

    Ok(app)
}

/// Add one route's handler to the method router of its path.
fn mount(
    endpoint: MethodRouter<AppState>,
    route: &Route,
    state: &AppState,
) -> Result<MethodRouter<AppState>> {
    let filter = MethodFilter::try_from(route.method.clone())
        .map_err(|_| Error::config(format!("unsupported method in route {route}")))?;

    let mounted = route.clone();
    let handler = move |State(state): State<AppState>,
                        id: std::result::Result<Path<u64>, PathRejection>,
                        request: Request| {
        let route = mounted.clone();
        async move { serve(&state, &route, id, request).await }
    };

    Ok(if route.protected {
        endpoint.on(filter, handler.layer(from_fn_with_state(state.clone(), auth_guard)))
    } else {
        endpoint.on(filter, handler)
    })
}

/// Build the handler's context and run it.
async fn serve(
    state: &AppState,
    route: &Route,
    id: std::result::Result<Path<u64>, PathRejection>,
    request: Request,
) -> ApiResult<Outcome> {
    // Routes without an `{id}` segment never look at the extracted id.
    let path_id = if route.takes_id() {
        let Path(id) =
            id.map_err(|e| ApiError::bad_request(format!("invalid id: {}", e.body_text())))?;
        Some(EntityId::new(id))
    } else {
        None
    };

    let (parts, body) = request.into_parts();
    let query = parse_query(parts.uri.query())?;
    let body = if !route.takes_body() {
        RequestBody::Empty
    } else if is_multipart(&parts.headers) {
        read_multipart(Request::from_parts(parts, body), state.max_body_bytes).await?
    } else {
        read_json(body, state.max_body_bytes).await?
    };

    debug!(%route, "Dispatching");
    let ctx = RequestContext {
        path_id,
        query,
        body,
    };
    route.handler().handle(ctx).await
}

/// Rejects callers the server's authenticator does not accept.
async fn auth_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let credentials = credentials(request.headers());
    state.server.authenticate(&credentials).await?;
    Ok(next.run(request).await)
}

fn credentials(headers: &HeaderMap) -> Credentials {
    match headers.get(header::AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(value) => Credentials::from_header(value),
            Err(_) => Credentials::Malformed("header is not valid ASCII".to_string()),
        },
        None => Credentials::None,
    }
}

fn parse_query(raw: Option<&str>) -> ApiResult<HashMap<String, String>> {
    match raw {
        Some(raw) => serde_urlencoded::from_str(raw)
            .map_err(|e| ApiError::bad_request(format!("malformed query string: {e}"))),
        None => Ok(HashMap::new()),
    }
}

/// Root handler - provides service info and the resource catalogue.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "endpoints": {
            "health": "/health",
        },
        "resources": state.server.resources(),
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// axum adds the Allow header listing the path's methods.
async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("route not found: {method} {}", uri.path()))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_json(body: Body, max_body_bytes: usize) -> ApiResult<RequestBody> {
    let bytes = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| {
            if exceeded_limit(e) {
                ApiError::PayloadTooLarge {
                    limit: max_body_bytes,
                }
            } else {
                ApiError::bad_request("failed to read request body")
            }
        })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RequestBody::Empty);
    }
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::bad_request(format!("malformed JSON body: {e}")))?;
    Ok(RequestBody::Json(value))
}

fn exceeded_limit(err: axum::Error) -> bool {
    let inner = err.into_inner();
    inner.is::<LengthLimitError>() || inner.source().is_some_and(|s| s.is::<LengthLimitError>())
}

async fn read_multipart(request: Request, max_body_bytes: usize) -> ApiResult<RequestBody> {
    let field_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: max_body_bytes,
            }
        } else {
            ApiError::bad_request(e.body_text())
        }
    };

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(field_error)?;
        parts.push(UploadPart {
            field: name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(RequestBody::Multipart(parts))
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Outcome::Download {
                content_type,
                file_name,
                data,
            } => download_response(&content_type, &file_name, data),
            other => {
                let body = other.json_body().unwrap_or_default();
                (status, Json(body)).into_response()
            }
        }
    }
}

fn download_response(content_type: &str, file_name: &str, data: Bytes) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::internal(format!("handler panicked: {detail}")).into_response()
}
