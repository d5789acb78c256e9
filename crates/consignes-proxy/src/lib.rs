#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use cache::{CachedResponse, ResponseCache};
pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use routes::{ProxyState, X_CACHE, router};
pub use server::{run, serve};
