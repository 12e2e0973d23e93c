//! Run configuration. Defaults reproduce the devnet enrollment; every
//! value can be overridden from the command line.

use std::time::Duration;

use thiserror::Error;

use crate::enroll::EnrollParams;
use crate::error::{LedgerError, ParseError};
use crate::rpc::Commitment;
use crate::types::{DerivationPath, Pubkey};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

const EXPLORER_TX_URL: &str = "https://explorer.solana.com/tx";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid derivation path: {0}")]
    Path(#[from] LedgerError),

    #[error("invalid program id: {0}")]
    ProgramId(#[from] ParseError),

    #[error("invalid RPC URL {0:?}: must start with http:// or https://")]
    RpcUrl(String),

    #[error("{0}")]
    Commitment(String),

    #[error("seed is {0} bytes (max 32)")]
    SeedTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub commitment: Commitment,
    pub rpc_timeout: Duration,
    pub enroll: EnrollParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: Commitment::default(),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            enroll: EnrollParams::default(),
        }
    }
}

impl Config {
    pub fn with_rpc_url(mut self, url: &str) -> Result<Self, ConfigError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::RpcUrl(url.to_string()));
        }
        self.rpc_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_derivation_path(mut self, path: &str) -> Result<Self, ConfigError> {
        self.enroll.derivation_path = path.parse::<DerivationPath>()?;
        Ok(self)
    }

    pub fn with_program_id(mut self, program_id: &str) -> Result<Self, ConfigError> {
        self.enroll.program_id = program_id.parse::<Pubkey>()?;
        Ok(self)
    }

    pub fn with_commitment(mut self, commitment: &str) -> Result<Self, ConfigError> {
        self.commitment = commitment.parse().map_err(ConfigError::Commitment)?;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: &[u8]) -> Result<Self, ConfigError> {
        if seed.len() > crate::pda::MAX_SEED_LEN {
            return Err(ConfigError::SeedTooLong(seed.len()));
        }
        self.enroll.seed = seed.to_vec();
        Ok(self)
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.enroll.payload = payload.to_vec();
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn with_confirm_address(mut self, confirm: bool) -> Self {
        self.enroll.confirm_address = confirm;
        self
    }

    /// Explorer link for `txid` on the cluster `rpc_url` points at.
    pub fn explorer_url(&self, txid: &str) -> String {
        let url = &self.rpc_url;
        let suffix = if url.contains("mainnet") {
            String::new()
        } else if url.contains("devnet") {
            "?cluster=devnet".to_string()
        } else if url.contains("testnet") {
            "?cluster=testnet".to_string()
        } else {
            format!("?cluster=custom&customUrl={url}")
        };
        format!("{EXPLORER_TX_URL}/{txid}{suffix}")
    }
}
