//! Sign and submit a Solana enrollment transaction with a Ledger device.
//!
//! Talks to the Solana Ledger app over USB HID or TCP (Speculos simulator),
//! builds the enrollment program's `submit` transaction, has the device
//! sign it, verifies the signature locally and broadcasts it over
//! JSON-RPC.
//!
//! # Quick start
//!
//! ```no_run
//! use ledger_enroll::{enroll, Config, LedgerSolana, RpcClient, TransportType};
//!
//! let config = Config::default();
//! let ledger = LedgerSolana::new(&TransportType::NativeHID)?;
//! let rpc = RpcClient::new(&config.rpc_url, config.rpc_timeout, config.commitment)?;
//!
//! let enrollment = enroll::run(&ledger, &rpc, &config.enroll)?;
//! println!("{}", config.explorer_url(&enrollment.txid));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`api`] -- high-level [`LedgerSolana`] facade and the [`DeviceSigner`] seam
//! - [`transport`] -- device communication (USB HID, TCP)
//! - [`message`] / [`tx`] -- Solana message compilation, signing slots, verification
//! - [`pda`] / [`program`] -- enrollment record address and `submit` instruction
//! - [`rpc`] -- JSON-RPC client and the [`Cluster`] seam
//! - [`enroll`] -- the sequential run
//! - [`types`] -- [`DerivationPath`], [`Pubkey`], [`Signature`], [`Hash`]
//!
//! # Feature flags
//!
//! - `hid` (default) -- USB HID transport for real Ledger devices
//! - `tcp` -- TCP transport for the Speculos simulator
//! - `solana-sdk-types` -- conversions between [`Hash`], [`Signature`],
//!   [`Instruction`] and their `solana-hash` / `solana-signature` /
//!   `solana-instruction` counterparts ([`Pubkey`] always converts to
//!   `solana_pubkey::Pubkey`)

pub(crate) mod apdu;
pub mod api;
pub(crate) mod commands;
pub mod config;
pub mod enroll;
pub mod error;
pub mod message;
pub mod pda;
pub mod program;
pub(crate) mod protocol;
pub mod rpc;
pub mod transport;
pub mod tx;
pub mod types;

pub use api::{DeviceSigner, LedgerSolana};
pub use config::{Config, ConfigError};
pub use enroll::{EnrollError, EnrollParams, Enrollment, Stage};
pub use error::{LedgerError, PdaError, RpcError, TxError};
pub use message::{AccountMeta, Instruction, Message};
pub use rpc::{Cluster, Commitment, RpcClient};
#[cfg(feature = "hid")]
pub use transport::hid::DeviceType;
pub use transport::TransportType;
pub use tx::Transaction;
pub use types::{AppConfiguration, DerivationPath, Hash, Pubkey, Signature};
