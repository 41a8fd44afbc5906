//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Provider Ports
//!
//! - `PaymentGateway` - Intent creation, callback verification, refunds, status polling
//! - `CurrencyConverter` - Fixed-rate conversion into a provider's charge currency
//! - `SessionDirectory` - Read access to booked sessions
//!
//! ## Persistence Ports
//!
//! - `PaymentRepository`, `MentorBalanceRepository`, `PayoutRepository`,
//!   `DisputeRepository` - Aggregates with optimistic versioning
//! - `WebhookEventRepository` - Callback idempotency tracking
//!
//! ## Event Ports
//!
//! - `EventPublisher` / `EventSubscriber` / `EventHandler`

mod balance_repository;
mod currency_converter;
mod dispute_repository;
mod event_publisher;
mod event_subscriber;
mod payment_gateway;
mod payment_repository;
mod payout_repository;
mod session_directory;
mod webhook_event_repository;

pub use balance_repository::{CommitOutcome, MentorBalanceRepository};
pub use currency_converter::CurrencyConverter;
pub use dispute_repository::{DisputeFilter, DisputeRepository};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use payment_gateway::{
    CallbackResult, CreatedIntent, GatewayError, GatewayErrorCode, IntentRequest, PaymentGateway,
    ProviderStatus, RefundRequest, RefundResult, SessionContext,
};
pub use payment_repository::PaymentRepository;
pub use payout_repository::{PayoutFilter, PayoutRepository};
pub use session_directory::{SessionDirectory, SessionSnapshot, SessionState};
pub use webhook_event_repository::{
    ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository,
};
