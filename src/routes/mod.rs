//! HTTP routes for casework

pub mod auth_routes;
pub mod graphql;
pub mod health;

pub use auth_routes::handle_auth_request;
pub use graphql::{graphiql_page, handle_graphql_get, handle_graphql_post};
pub use health::health_check;
