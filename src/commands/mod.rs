//! Individual command implementations.
//!
//! You probably want [`LedgerSolana`](crate::api::LedgerSolana) instead.

pub mod get_app_config;
pub mod get_pubkey;
pub mod sign_message;
