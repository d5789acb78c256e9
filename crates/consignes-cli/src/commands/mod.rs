//! Command handlers.

pub mod consigne;
pub mod form;
pub mod serve;

use chrono::{Local, NaiveDate};

use consignes_client::ApiClient;

use crate::config::ConsignesConfig;
use crate::error::Result;

/// Backend client built from the configuration.
pub fn api_client(config: &ConsignesConfig) -> Result<ApiClient> {
    Ok(ApiClient::new(&config.backend)?.with_retry(config.retry.clone()))
}

/// Local calendar day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
