use crate::apdu::{Instruction, P1_CONFIRM};
use crate::error::LedgerError;
use crate::protocol;
use crate::transport::Transport;
use crate::types::{DerivationPath, Signature};

/// Payload: `[signer_count = 1][derivation path][message bytes]`,
/// chunked across APDUs. The device shows the transaction and waits for
/// approval; the final answer is a 64-byte Ed25519 signature.
pub fn exec(
    transport: &dyn Transport,
    path: &DerivationPath,
    message: &[u8],
) -> Result<Signature, LedgerError> {
    let payload = build_payload(path, message);
    let result = protocol::execute(transport, Instruction::SignMessage, P1_CONFIRM, &payload)?;
    parse_signature(&result)
}

pub(crate) fn build_payload(path: &DerivationPath, message: &[u8]) -> Vec<u8> {
    let path_bytes = path.serialize();
    let mut payload = Vec::with_capacity(1 + path_bytes.len() + message.len());
    payload.push(1);
    payload.extend_from_slice(&path_bytes);
    payload.extend_from_slice(message);
    payload
}

pub(crate) fn parse_signature(data: &[u8]) -> Result<Signature, LedgerError> {
    if data.len() < 64 {
        return Err(LedgerError::InvalidResponse(format!(
            "expected 64-byte signature, got {} bytes",
            data.len()
        )));
    }

    let mut sig = [0u8; 64];
    sig.copy_from_slice(&data[..64]);
    Ok(Signature(sig))
}
