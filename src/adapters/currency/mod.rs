//! Currency conversion adapters.

mod fixed_rate;

pub use fixed_rate::FixedRateConverter;
