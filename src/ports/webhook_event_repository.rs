//! WebhookEventRepository port - tracks processed provider callbacks.
//!
//! Providers redeliver on timeouts and 5xx responses, and sometimes deliver
//! the same event twice on their own. Each delivery id is recorded once with
//! its outcome so duplicates are acknowledged without reprocessing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, Timestamp, ValidationError};
use crate::domain::payment::PaymentProvider;

/// How a callback was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingResult {
    Success,
    Ignored,
    Failed,
}

impl ProcessingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingResult::Success => "success",
            ProcessingResult::Ignored => "ignored",
            ProcessingResult::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingResult {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ProcessingResult::Success),
            "ignored" => Ok(ProcessingResult::Ignored),
            "failed" => Ok(ProcessingResult::Failed),
            other => Err(ValidationError::invalid_format(
                "result",
                format!("unknown processing result '{}'", other),
            )),
        }
    }
}

/// Record of a processed webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    pub provider: PaymentProvider,
    /// Provider delivery id (Stripe `evt_...`, Paymob transaction id).
    pub event_id: String,
    pub event_type: String,
    pub provider_payment_id: Option<String>,
    pub processed_at: Timestamp,
    pub result: ProcessingResult,
    /// Why it was ignored or failed.
    pub detail: Option<String>,
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    fn build(
        provider: PaymentProvider,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        result: ProcessingResult,
        detail: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            provider,
            event_id: event_id.into(),
            event_type: event_type.into(),
            provider_payment_id: None,
            processed_at: Timestamp::now(),
            result,
            detail,
            payload,
        }
    }

    pub fn success(
        provider: PaymentProvider,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(provider, event_id, event_type, ProcessingResult::Success, None, payload)
    }

    pub fn ignored(
        provider: PaymentProvider,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            provider,
            event_id,
            event_type,
            ProcessingResult::Ignored,
            Some(reason.into()),
            payload,
        )
    }

    pub fn failed(
        provider: PaymentProvider,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            provider,
            event_id,
            event_type,
            ProcessingResult::Failed,
            Some(error.into()),
            payload,
        )
    }

    pub fn for_payment(mut self, provider_payment_id: impl Into<String>) -> Self {
        self.provider_payment_id = Some(provider_payment_id.into());
        self
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event.
    Inserted,
    /// Another delivery already recorded it.
    AlreadyExists,
}

/// Port for storing processed webhook events.
///
/// Implementations key on (provider, event_id) with a unique constraint so
/// concurrent deliveries of one event resolve to a single record.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find(
        &self,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Inserts with `ON CONFLICT DO NOTHING` semantics.
    async fn save(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError>;
}
