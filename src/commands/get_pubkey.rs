use crate::apdu::{Instruction, P1_CONFIRM, P1_NON_CONFIRM};
use crate::error::LedgerError;
use crate::protocol;
use crate::transport::Transport;
use crate::types::{DerivationPath, Pubkey};

/// Request: serialized derivation path. Response: the 32-byte public key.
///
/// With `display` set the device shows the address and blocks until the
/// user approves or rejects.
pub fn exec(
    transport: &dyn Transport,
    path: &DerivationPath,
    display: bool,
) -> Result<Pubkey, LedgerError> {
    let p1 = if display { P1_CONFIRM } else { P1_NON_CONFIRM };
    let result = protocol::execute(transport, Instruction::GetPubkey, p1, &path.serialize())?;
    parse_pubkey_response(&result)
}

pub(crate) fn parse_pubkey_response(data: &[u8]) -> Result<Pubkey, LedgerError> {
    let bytes: [u8; 32] = data
        .get(..32)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            LedgerError::InvalidResponse(format!(
                "expected 32-byte public key, got {} bytes",
                data.len()
            ))
        })?;

    if bytes.iter().all(|&b| b == 0) {
        return Err(LedgerError::InvalidResponse("device returned an all-zero public key".into()));
    }

    Ok(Pubkey(bytes))
}
