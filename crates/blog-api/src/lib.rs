pub mod articles;
pub mod auth;
pub mod comments;
pub mod credentials;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod router;
pub mod service;
pub mod session;
