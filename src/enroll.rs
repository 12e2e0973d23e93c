//! The enrollment run: derive the key, build the `submit` transaction,
//! have the device sign it, verify the signature locally, broadcast.
//!
//! Every step depends on the previous one and nothing is retried. A
//! transaction whose signature does not verify is never handed to the
//! cluster.

use thiserror::Error;

use crate::api::DeviceSigner;
use crate::error::{LedgerError, PdaError, RpcError, TxError};
use crate::message::Message;
use crate::program;
use crate::rpc::Cluster;
use crate::tx::Transaction;
use crate::types::{DerivationPath, Pubkey, Signature};

/// Progress through the run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    DeviceConnected,
    AddressDerived,
    TransactionBuilt,
    Signed,
    Verified,
    Broadcast,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::DeviceConnected => "device connected",
            Self::AddressDerived => "address derived",
            Self::TransactionBuilt => "transaction built",
            Self::Signed => "signed",
            Self::Verified => "verified",
            Self::Broadcast => "broadcast",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("device error after stage '{stage}': {source}")]
    Device {
        stage: Stage,
        #[source]
        source: LedgerError,
    },

    #[error("network error after stage '{stage}': {source}")]
    Network {
        stage: Stage,
        #[source]
        source: RpcError,
    },

    #[error("signature invalid, transaction not sent: {0}")]
    SignatureInvalid(#[source] TxError),

    #[error("program rejected the transaction: {0}")]
    ProgramRejection(#[source] RpcError),

    #[error("cannot derive enrollment address: {0}")]
    Address(#[from] PdaError),

    #[error("cannot build transaction: {0}")]
    Build(#[source] TxError),
}

impl EnrollError {
    pub fn device(stage: Stage, source: LedgerError) -> Self {
        Self::Device { stage, source }
    }

    /// Program failures reported by the endpoint get their own kind;
    /// everything else from the endpoint is a network error.
    pub fn from_rpc(stage: Stage, source: RpcError) -> Self {
        if source.is_program_rejection() {
            Self::ProgramRejection(source)
        } else {
            Self::Network { stage, source }
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Address(_) | Self::Build(_) => 2,
            Self::Device { .. } => 10,
            Self::Network { .. } => 11,
            Self::SignatureInvalid(_) => 12,
            Self::ProgramRejection(_) => 13,
        }
    }
}

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollParams {
    pub derivation_path: DerivationPath,
    pub payload: Vec<u8>,
    pub seed: Vec<u8>,
    pub program_id: Pubkey,
    pub confirm_address: bool,
}

impl Default for EnrollParams {
    fn default() -> Self {
        Self {
            derivation_path: DerivationPath::default(),
            payload: program::DEFAULT_PAYLOAD.to_vec(),
            seed: program::DEFAULT_SEED.to_vec(),
            program_id: program::ENROLLMENT_PROGRAM_ID,
            confirm_address: false,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub signer: Pubkey,
    pub enrollment: Pubkey,
    pub bump: u8,
    pub signature: Signature,
    /// Identifier returned by the endpoint.
    pub txid: String,
}

struct Progress {
    stage: Stage,
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage went backwards: {} -> {next}", self.stage);
        log::info!("{next}");
        self.stage = next;
    }
}

/// Run the enrollment against an already connected device.
pub fn run<D, C>(
    device: &D,
    cluster: &C,
    params: &EnrollParams,
) -> Result<Enrollment, EnrollError>
where
    D: DeviceSigner + ?Sized,
    C: Cluster + ?Sized,
{
    let mut progress = Progress {
        stage: Stage::DeviceConnected,
    };
    let path = &params.derivation_path;

    let signer = device
        .pubkey(path, params.confirm_address)
        .map_err(|e| EnrollError::device(progress.stage, e))?;
    log::info!("ledger public key {signer} ({path})");
    progress.advance(Stage::AddressDerived);

    let (enrollment, bump) =
        program::enrollment_address(&params.seed, &signer, &params.program_id)?;
    log::debug!("enrollment record {enrollment} (bump {bump})");
    let instruction = program::submit(&params.program_id, &signer, &enrollment, &params.payload);

    let blockhash = cluster
        .latest_blockhash()
        .map_err(|e| EnrollError::from_rpc(progress.stage, e))?;
    let message = Message::new_with_blockhash(&[instruction], Some(&signer), &blockhash)
        .map_err(EnrollError::Build)?;
    let mut tx = Transaction::new_unsigned(message);
    tx.check_size().map_err(EnrollError::Build)?;
    let message_data = tx.message_data();
    progress.advance(Stage::TransactionBuilt);

    let signature = device
        .sign_message(path, &message_data)
        .map_err(|e| EnrollError::device(progress.stage, e))?;
    tx.add_signature(&signer, signature)
        .map_err(EnrollError::SignatureInvalid)?;
    progress.advance(Stage::Signed);

    if let Err(e) = tx.verify() {
        log::warn!("device signature failed local verification: {e}");
        return Err(EnrollError::SignatureInvalid(e));
    }
    progress.advance(Stage::Verified);

    let txid = cluster
        .send_transaction(&tx.serialize())
        .map_err(|e| EnrollError::from_rpc(progress.stage, e))?;
    progress.advance(Stage::Broadcast);

    progress.advance(Stage::Done);
    Ok(Enrollment {
        signer,
        enrollment,
        bump,
        signature,
        txid,
    })
}
