//! Payment domain module.
//!
//! - `aggregate` - Payment entity and refund history
//! - `status` - PaymentStatus state machine and callback ordering
//! - `provider` - Provider and payment-method enums
//! - `commission` - Frozen commission split

mod aggregate;
mod commission;
mod errors;
mod events;
mod provider;
mod status;

pub use aggregate::{NewPayment, Payment, Refund};
pub use commission::CommissionSplit;
pub use errors::PaymentError;
pub use events::PaymentEvent;
pub use provider::{PaymentMethod, PaymentProvider};
pub use status::{CallbackStatus, PaymentStatus};
