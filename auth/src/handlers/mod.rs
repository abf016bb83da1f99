pub mod auth;

pub use auth::configure_auth_routes;
