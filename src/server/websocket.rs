//! GraphQL subscriptions over WebSocket
//!
//! Handles the `/graphql` upgrade and runs the async-graphql WebSocket
//! protocol over the upgraded connection.
//!
//! Authentication flow:
//! 1. Token from the `connection_init` payload (`Authorization`,
//!    `authorization` or `authToken`)
//! 2. Token from the upgrade request's Authorization header
//! 3. Otherwise the connection is anonymous

use async_graphql::http::{WebSocket, WebSocketProtocols, WsMessage};
use async_graphql::{Data, ErrorExtensions};
use futures::{future, SinkExt, StreamExt};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use hyper::{Request, Response, StatusCode};
use hyper_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use hyper_tungstenite::tungstenite::protocol::CloseFrame;
use hyper_tungstenite::tungstenite::Message;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::extract_token_from_header;
use crate::context::ContextProvider;
use crate::server::http::{json_response, to_boxed, AppState, BoxBody};

/// Keys of the `connection_init` payload that may carry the token
const INIT_TOKEN_KEYS: [&str; 3] = ["Authorization", "authorization", "authToken"];

/// Pick the first subprotocol offered by the client that we speak
pub fn negotiate_protocol(offered: Option<&str>) -> Option<WebSocketProtocols> {
    offered?
        .split(',')
        .find_map(|p| WebSocketProtocols::from_str(p.trim()).ok())
}

/// Token carried in a `connection_init` payload, with or without the `Bearer` scheme
pub fn token_from_init_payload(payload: &serde_json::Value) -> Option<String> {
    let raw = INIT_TOKEN_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(|v| v.as_str()))?;

    match extract_token_from_header(Some(raw)) {
        Some(token) => Some(token.to_string()),
        None => {
            let raw = raw.trim();
            (!raw.is_empty() && !raw.contains(' ')).then(|| raw.to_string())
        }
    }
}

/// Handle the WebSocket upgrade for GraphQL subscriptions
pub async fn handle_graphql_upgrade(
    state: Arc<AppState>,
    mut req: Request<Incoming>,
) -> Response<BoxBody> {
    let offered = req
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok());

    let Some(protocol) = negotiate_protocol(offered) else {
        warn!("GraphQL WebSocket upgrade without a supported subprotocol: {:?}", offered);
        let body = serde_json::json!({
            "error": "Bad Request",
            "message": "Expected Sec-WebSocket-Protocol graphql-transport-ws or graphql-ws"
        });
        return to_boxed(json_response(StatusCode::BAD_REQUEST, body.to_string()));
    };

    let header_token = extract_token_from_header(
        req.headers()
            .get(hyper::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
    .map(str::to_string);

    match hyper_tungstenite::upgrade(&mut req, None) {
        Ok((mut response, websocket)) => {
            response.headers_mut().insert(
                SEC_WEBSOCKET_PROTOCOL,
                HeaderValue::from_static(protocol.sec_websocket_protocol()),
            );
            info!(
                "GraphQL WebSocket upgrade (protocol: {})",
                protocol.sec_websocket_protocol()
            );

            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => {
                        let (mut sink, source) = ws.split();

                        let input = source
                            .take_while(|msg| future::ready(msg.is_ok()))
                            .filter_map(|msg| {
                                future::ready(match msg {
                                    Ok(Message::Text(text)) => Some(text.into_bytes()),
                                    Ok(Message::Binary(bytes)) => Some(bytes),
                                    _ => None,
                                })
                            });

                        let contexts = state.contexts.clone();
                        let messages = WebSocket::new(state.schema.clone(), input, protocol)
                            .on_connection_init(move |payload| {
                                connection_data(contexts, payload, header_token)
                            });
                        let mut messages = std::pin::pin!(messages);

                        while let Some(message) = messages.next().await {
                            let outgoing = match message {
                                WsMessage::Text(text) => Message::Text(text),
                                WsMessage::Close(code, reason) => Message::Close(Some(CloseFrame {
                                    code: CloseCode::from(code),
                                    reason: Cow::Owned(reason),
                                })),
                            };
                            if let Err(e) = sink.send(outgoing).await {
                                debug!("GraphQL WebSocket send failed: {}", e);
                                break;
                            }
                        }
                        debug!("GraphQL WebSocket closed");
                    }
                    Err(e) => {
                        error!("GraphQL WebSocket upgrade error: {:?}", e);
                    }
                }
            });

            to_boxed(response)
        }
        Err(e) => {
            error!("WebSocket upgrade failed: {:?}", e);
            let body = serde_json::json!({
                "error": "Bad Request",
                "message": "WebSocket upgrade failed"
            });
            to_boxed(json_response(StatusCode::BAD_REQUEST, body.to_string()))
        }
    }
}

/// Connection data for an initialised subscription connection
async fn connection_data(
    contexts: ContextProvider,
    payload: serde_json::Value,
    header_token: Option<String>,
) -> async_graphql::Result<Data> {
    let token = token_from_init_payload(&payload).or(header_token);

    let ctx = contexts
        .from_token(token.as_deref())
        .await
        .map_err(|e| e.extend())?;

    debug!(
        request_id = %ctx.request_id,
        authenticated = ctx.identity().is_some(),
        "subscription connection initialised"
    );

    let mut data = Data::default();
    data.insert(ctx);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negotiates_supported_protocol() {
        assert_eq!(
            negotiate_protocol(Some("graphql-transport-ws")),
            Some(WebSocketProtocols::GraphQLWS)
        );
        assert_eq!(
            negotiate_protocol(Some("chat, graphql-ws")),
            Some(WebSocketProtocols::SubscriptionsTransportWS)
        );
        assert_eq!(negotiate_protocol(Some("chat")), None);
        assert_eq!(negotiate_protocol(None), None);
    }

    #[test]
    fn test_init_payload_token_keys() {
        assert_eq!(
            token_from_init_payload(&json!({ "Authorization": "Bearer abc" })).as_deref(),
            Some("abc")
        );
        assert_eq!(
            token_from_init_payload(&json!({ "authorization": "bearer xyz" })).as_deref(),
            Some("xyz")
        );
        assert_eq!(
            token_from_init_payload(&json!({ "authToken": "raw-token" })).as_deref(),
            Some("raw-token")
        );
        assert_eq!(token_from_init_payload(&json!({})), None);
        assert_eq!(token_from_init_payload(&json!({ "authToken": "" })), None);
    }
}
