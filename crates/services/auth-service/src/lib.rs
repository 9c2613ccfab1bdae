//! Auth Service Library
//!
//! Registration, login and bearer tokens for job board users. Users are read
//! and written through the document-service repositories.

pub mod config;
pub mod service;

pub use config::AuthServiceConfig;
pub use service::{AuthService, Authenticator, Claims, Token, TokenData};
