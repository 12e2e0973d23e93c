//! Program-derived addresses.
//!
//! `sha256(seeds.. ‖ program_id ‖ "ProgramDerivedAddress")`, accepted
//! only if the digest is not a valid ed25519 point (so no private key
//! can exist for it). [`find_program_address`] walks the bump seed down
//! from 255 until that holds. The hashing and curve check come from
//! `solana-pubkey`; seed limits are checked here so callers get a
//! precise error.

use solana_pubkey::PubkeyError;

use crate::error::PdaError;
use crate::types::Pubkey;

pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), PdaError> {
    if seeds.len() > max_seeds {
        return Err(PdaError::TooManySeeds(seeds.len()));
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(PdaError::SeedTooLong {
                index,
                len: seed.len(),
            });
        }
    }
    Ok(())
}

pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Pubkey, PdaError> {
    check_seeds(seeds, MAX_SEEDS)?;

    solana_pubkey::Pubkey::create_program_address(seeds, &(*program_id).into())
        .map(Pubkey::from)
        .map_err(|e| match e {
            PubkeyError::InvalidSeeds => PdaError::OnCurve,
            PubkeyError::IllegalOwner => PdaError::IllegalOwner,
            _ => PdaError::TooManySeeds(seeds.len()),
        })
}

/// Returns the address and the bump seed that produced it.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), PdaError> {
    // the bump takes one of the seed slots
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::TooManySeeds(seeds.len() + 1));
    }
    check_seeds(seeds, MAX_SEEDS - 1)?;

    solana_pubkey::Pubkey::try_find_program_address(seeds, &(*program_id).into())
        .map(|(address, bump)| (Pubkey::from(address), bump))
        .ok_or(PdaError::NoViableBump)
}
