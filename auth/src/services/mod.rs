pub mod accounts;
pub mod hashing;
pub mod mailing;
pub mod middleware;
pub mod oauth;
pub mod store;
pub mod tokens;
pub mod verification;

pub use accounts::AccountService;
pub use mailing::MailingService;
pub use oauth::OAuth2Service;
pub use store::UserStore;
pub use tokens::TokenService;
pub use verification::VerificationService;
