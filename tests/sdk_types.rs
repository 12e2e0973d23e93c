//! Compiled messages must match the Solana SDK byte for byte.
//!
//! `cargo test --features solana-sdk-types`

#![cfg(feature = "solana-sdk-types")]

use ed25519_dalek::SigningKey;
use ledger_enroll::{program, Hash, Message, Pubkey, Signature};

fn signer(seed: u8) -> Pubkey {
    Pubkey(SigningKey::from_bytes(&[seed; 32]).verifying_key().to_bytes())
}

#[test]
fn enrollment_address_matches_sdk() {
    for seed in [1u8, 7, 42, 200] {
        let key = signer(seed);
        let (ours, bump) =
            program::enrollment_address(b"preQ225", &key, &program::ENROLLMENT_PROGRAM_ID)
                .unwrap();

        let sdk_signer = solana_pubkey::Pubkey::from(key);
        let (theirs, sdk_bump) = solana_pubkey::Pubkey::find_program_address(
            &[b"preQ225", sdk_signer.as_ref()],
            &program::ENROLLMENT_PROGRAM_ID.into(),
        );
        assert_eq!(solana_pubkey::Pubkey::from(ours), theirs);
        assert_eq!(bump, sdk_bump);
    }
}

#[test]
fn enrollment_message_matches_sdk() {
    let blockhash = Hash([0x5C; 32]);
    for seed in [1u8, 7, 42, 200] {
        let key = signer(seed);
        let (record, _) =
            program::enrollment_address(b"preQ225", &key, &program::ENROLLMENT_PROGRAM_ID)
                .unwrap();
        let ix = program::submit(&program::ENROLLMENT_PROGRAM_ID, &key, &record, b"MuzykPro");

        let ours = Message::new_with_blockhash(&[ix.clone()], Some(&key), &blockhash)
            .unwrap()
            .serialize();

        let sdk_ix = solana_instruction::Instruction::from(&ix);
        let theirs = solana_message::legacy::Message::new_with_blockhash(
            &[sdk_ix],
            Some(&key.into()),
            &blockhash.into(),
        )
        .serialize();

        assert_eq!(ours, theirs, "signer seed {seed}");
    }
}

#[test]
fn hash_and_signature_round_trip() {
    let hash = Hash([0x11; 32]);
    let sdk_hash = solana_hash::Hash::from(hash);
    assert_eq!(sdk_hash.to_string(), hash.to_string());
    assert_eq!(Hash::from(sdk_hash), hash);

    let sig = Signature([0x22; 64]);
    let sdk_sig = solana_signature::Signature::from(sig);
    assert_eq!(sdk_sig.to_string(), sig.to_string());
    assert_eq!(Signature::from(sdk_sig), sig);
}
