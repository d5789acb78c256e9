#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod mock;
pub mod retry;
pub mod save;

pub use api::ApiClient;
pub use config::{AutosaveConfig, BackendConfig};
pub use retry::RetryPolicy;
pub use save::{AnswerSink, Autosaver, FlushOutcome, SaveQueue};
