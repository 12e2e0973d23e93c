//! The enrollment program: its address, the per-signer record address
//! and the `submit` instruction.
//!
//! The program is an Anchor program. Instruction data is the 8-byte
//! method discriminator followed by the Borsh-encoded arguments.

use sha2::{Digest, Sha256};

use crate::error::PdaError;
use crate::message::{AccountMeta, Instruction};
use crate::pda;
use crate::types::Pubkey;

/// `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// `TRBZyQHB3m68FGeVsqTK39Wm4xejadjVhP5MAZaKWDM`
pub const ENROLLMENT_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    6, 196, 113, 166, 248, 115, 210, 69, 107, 230, 199, 228, 26, 254, 61, 39, 173, 201, 240, 162,
    228, 187, 209, 171, 103, 231, 17, 143, 158, 25, 36, 0,
]);

pub const DEFAULT_SEED: &[u8] = b"preQ225";
pub const DEFAULT_PAYLOAD: &[u8] = b"MuzykPro";

/// Anchor method discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn sighash(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Address of the enrollment record for `signer`, plus its bump.
pub fn enrollment_address(
    seed: &[u8],
    signer: &Pubkey,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), PdaError> {
    pda::find_program_address(&[seed, signer.as_ref()], program_id)
}

/// `submit(payload: Vec<u8>)`
///
/// Accounts: `signer` (writable, signs and pays), `prereq` (the
/// enrollment record, writable), `system_program`.
pub fn submit(
    program_id: &Pubkey,
    signer: &Pubkey,
    enrollment: &Pubkey,
    payload: &[u8],
) -> Instruction {
    let mut data = Vec::with_capacity(8 + 4 + payload.len());
    data.extend_from_slice(&sighash("submit"));
    encode_bytes(payload, &mut data);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(*enrollment, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    }
}

/// Borsh `Vec<u8>`: `u32` LE length then the bytes.
fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}
