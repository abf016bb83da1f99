// User-authentication service: registration, login, email verification and
// multi-provider account linking (password + Facebook/Google/LinkedIn OAuth2)
// over a relational store.

pub mod emails;
pub mod error;
pub mod handlers;
pub mod services;

pub use error::AuthError;
