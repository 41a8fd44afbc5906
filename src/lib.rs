//! Mentorship Ledger - payments, mentor balances, payouts and disputes
//!
//! Collects session payments through Stripe and Paymob, reconciles provider
//! callbacks, credits mentors through an append-only ledger, and settles
//! payouts and mentee disputes against those balances.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
