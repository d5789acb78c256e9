//! HTTP client for the spreadsheet backend.

use async_trait::async_trait;
use reqwest::{StatusCode, Url, header::RETRY_AFTER};
use serde::de::DeserializeOwned;

use consignes_core::api::{
    ApiResponse, Command, Deleted, FormPayload, Query, SaveReceipt, SaveRequest, TOKEN_PARAM,
};
use consignes_core::{Consigne, ConsigneDraft, ConsigneId, Error, Form, FormKey, Result};

use crate::config::BackendConfig;
use crate::retry::{RetryPolicy, is_refused_before_processing};
use crate::save::AnswerSink;

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the backend's single endpoint.
///
/// Reads and idempotent writes are retried with the configured
/// [`RetryPolicy`]. Creating a consigne is only replayed when the backend
/// refused it outright, so a lost response never creates a duplicate.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    url: Url,
    token: String,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client from its configuration.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::config("backend.url is not set"));
        }
        let url = Url::parse(config.url.trim())
            .map_err(|e| Error::config(format!("invalid backend.url '{}': {e}", config.url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            token: config.token.clone(),
            timeout_secs: config.timeout().as_secs(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches the questions and stored answers of a form.
    pub async fn fetch_form(&self, key: &FormKey) -> Result<Form> {
        let query = Query::form(key);
        tracing::debug!(form = %key, "Fetching form");
        let payload: FormPayload = self
            .retry
            .run("fetch_form", || self.get_once(&query))
            .await?;
        tracing::info!(form = %key, questions = payload.questions.len(), "Form loaded");
        Ok(payload.into_form(key.clone()))
    }

    /// Lists every consigne.
    pub async fn list_consignes(&self) -> Result<Vec<Consigne>> {
        self.retry
            .run("list_consignes", || self.get_once(&Query::Consignes))
            .await
    }

    /// Creates a consigne after presence checks.
    pub async fn create_consigne(&self, draft: &ConsigneDraft) -> Result<Consigne> {
        draft.validate()?;
        let command = Command::CreateConsigne {
            consigne: draft.clone(),
        };
        let created: Consigne = self
            .retry
            .run_with(
                "create_consigne",
                || self.post_once(&command),
                is_refused_before_processing,
                |_, _| {},
            )
            .await?;
        tracing::info!(id = %created.id, label = %created.label, "Consigne created");
        Ok(created)
    }

    /// Replaces the fields of an existing consigne.
    pub async fn update_consigne(&self, id: &ConsigneId, draft: &ConsigneDraft) -> Result<Consigne> {
        draft.validate()?;
        let command = Command::UpdateConsigne {
            id: id.clone(),
            consigne: draft.clone(),
        };
        let updated: Consigne = self
            .retry
            .run("update_consigne", || self.post_once(&command))
            .await?;
        tracing::info!(id = %updated.id, "Consigne updated");
        Ok(updated)
    }

    /// Deletes a consigne.
    pub async fn delete_consigne(&self, id: &ConsigneId) -> Result<()> {
        let command = Command::DeleteConsigne { id: id.clone() };
        let deleted: Deleted = self
            .retry
            .run("delete_consigne", || self.post_once(&command))
            .await?;
        tracing::info!(id = %deleted.id, "Consigne deleted");
        Ok(())
    }

    /// Soft-saves answers, with retry.
    pub async fn save_answers(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        let command = Command::SaveAnswers(request.clone());
        self.retry
            .run("save_answers", || self.post_once(&command))
            .await
    }

    /// Submits a complete form, with retry.
    pub async fn submit_answers(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        let command = Command::SubmitAnswers(request.clone());
        self.retry
            .run("submit_answers", || self.post_once(&command))
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, query: &Query) -> Result<T> {
        let response = self
            .http
            .get(self.url.clone())
            .query(&[(TOKEN_PARAM, self.token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_envelope(response).await
    }

    async fn post_once<T: DeserializeOwned>(&self, command: &Command) -> Result<T> {
        tracing::debug!(action = command.action(), "Posting command");
        let response = self
            .http
            .post(self.url.clone())
            .query(&[(TOKEN_PARAM, self.token.as_str())])
            .json(command)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_envelope(response).await
    }

    async fn read_envelope<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(Error::RateLimited { retry_after_secs });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::http_status(
                status.as_u16(),
                format!("backend answered {status}: {snippet}"),
            ));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        envelope.into_result()
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            return Error::Timeout {
                seconds: self.timeout_secs,
            };
        }
        let status = err.status().map(|s| s.as_u16());
        Error::http_with_source(format!("request to backend failed: {err}"), status, err)
    }
}

#[async_trait]
impl AnswerSink for ApiClient {
    async fn save(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        self.post_once(&Command::SaveAnswers(request.clone())).await
    }

    async fn submit(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        self.post_once(&Command::SubmitAnswers(request.clone()))
            .await
    }
}
