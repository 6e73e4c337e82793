//! HTTP and WebSocket server

pub mod http;
pub mod websocket;

pub use http::{run, AppState, BoxBody};
