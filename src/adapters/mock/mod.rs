//! Mock adapters for tests and local development.

mod mock_gateway;

pub use mock_gateway::{MethodCall, MockCallback, MockPaymentGateway};
