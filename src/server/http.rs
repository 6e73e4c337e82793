//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection, upgrades enabled
//! for GraphQL subscriptions.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::{Args, StorageBackend};
use crate::context::ContextProvider;
use crate::db::Collections;
use crate::graphql::{build_schema, CaseworkSchema};
use crate::interactors::Interactors;
use crate::publisher::Publisher;
use crate::routes;
use crate::server::websocket;
use crate::types::CaseworkError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Backend actually in use (may differ from `args.storage` after a dev-mode fallback)
    pub storage: StorageBackend,
    pub collections: Collections,
    pub publisher: Publisher,
    /// Bearer token to request context
    pub contexts: ContextProvider,
    pub schema: CaseworkSchema,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the publisher, interactors and schema around a set of collections
    pub fn new(
        args: Args,
        storage: StorageBackend,
        collections: Collections,
        jwt: JwtValidator,
    ) -> Self {
        let publisher = Publisher::new(args.subscription_buffer);
        let interactors = Arc::new(Interactors::new(&collections, &publisher));
        let contexts = ContextProvider::new(jwt, collections.users.clone());

        Self {
            args,
            storage,
            schema: build_schema(interactors),
            collections,
            publisher,
            contexts,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), CaseworkError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Casework listening on {} (storage: {})",
        state.args.listen, state.storage
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - GraphiQL served at /graphiql");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {:?}", e);
            }
        }
    }
}

/// Route a request to its handler
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(to_boxed(preflight_response()));
    }

    // Auth routes consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            to_boxed(routes::health_check(&state))
        }
        (&Method::GET, "/graphql") if hyper_tungstenite::is_upgrade_request(&req) => {
            websocket::handle_graphql_upgrade(state, req).await
        }
        (&Method::GET, "/graphql") => routes::handle_graphql_get(state, req).await,
        (&Method::POST, "/graphql") => routes::handle_graphql_post(state, req).await,
        (&Method::GET, "/graphiql") if state.args.dev_mode => to_boxed(routes::graphiql_page()),
        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a full body response into a boxed one
pub(crate) fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// Attach the permissive CORS headers every response carries
pub(crate) fn with_cors<B>(mut response: Response<B>) -> Response<B> {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

/// Response with a status and a JSON body
pub(crate) fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = with_cors(Response::new(Full::new(Bytes::new())));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
        .headers_mut()
        .insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "GraphQL is served at /graphql"
    });

    json_response(StatusCode::NOT_FOUND, body.to_string())
}
