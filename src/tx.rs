//! Signed transactions: signature slots, local verification and the
//! wire format sent to the cluster.

use ed25519_dalek::VerifyingKey;

use crate::error::TxError;
use crate::message::{encode_shortvec_len, Message};
use crate::types::{Pubkey, Signature};

/// Largest serialized transaction a cluster accepts (IPv6 MTU minus headers).
pub const PACKET_DATA_SIZE: usize = 1232;

/// A compiled message plus one signature slot per required signer.
///
/// Slots start out empty (all zeros) and get filled by
/// [`add_signature`](Transaction::add_signature).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.header.num_required_signatures as usize;
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// Exact bytes every signer has to sign.
    pub fn message_data(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Place `signature` in the slot belonging to `pubkey`.
    ///
    /// Nothing is checked here; call [`verify`](Transaction::verify)
    /// before handing the transaction to anyone.
    pub fn add_signature(
        &mut self,
        pubkey: &Pubkey,
        signature: Signature,
    ) -> Result<(), TxError> {
        let index = self
            .message
            .signer_keys()
            .iter()
            .position(|k| k == pubkey)
            .ok_or(TxError::NotASigner(*pubkey))?;
        let slots = self.signatures.len();
        let slot = self.signatures.get_mut(index).ok_or(TxError::SignatureCount {
            expected: index + 1,
            got: slots,
        })?;
        *slot = signature;
        Ok(())
    }

    /// Check every required signature against its signer key over the
    /// serialized message. Fails on the first bad or empty slot.
    pub fn verify(&self) -> Result<(), TxError> {
        let signers = self.message.signer_keys();
        let expected = self.message.header.num_required_signatures as usize;
        if self.signatures.len() != expected || signers.len() != expected {
            return Err(TxError::SignatureCount {
                expected,
                got: self.signatures.len(),
            });
        }

        let data = self.message_data();
        for (index, (pubkey, signature)) in signers.iter().zip(&self.signatures).enumerate() {
            if signature.is_empty() {
                return Err(TxError::MissingSignature {
                    index,
                    pubkey: *pubkey,
                });
            }

            let key = VerifyingKey::from_bytes(&pubkey.0).map_err(|_| TxError::InvalidSignerKey {
                index,
                pubkey: *pubkey,
            })?;
            let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
            key.verify_strict(&data, &sig)
                .map_err(|_| TxError::SignatureInvalid {
                    index,
                    pubkey: *pubkey,
                })?;
        }

        Ok(())
    }

    /// Fails if the wire form would not fit in one packet. Signature slots
    /// count whether filled or not, so this holds before signing.
    pub fn check_size(&self) -> Result<(), TxError> {
        let size = self.serialize().len();
        if size > PACKET_DATA_SIZE {
            return Err(TxError::TooLarge {
                size,
                max: PACKET_DATA_SIZE,
            });
        }
        Ok(())
    }

    /// Fee-payer signature, which is also the transaction id on Solana.
    pub fn id(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Wire format: `[shortvec signatures][64 bytes each][message]`.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message_data();
        let mut buf = Vec::with_capacity(3 + self.signatures.len() * 64 + message.len());
        encode_shortvec_len(self.signatures.len(), &mut buf);
        for sig in &self.signatures {
            buf.extend_from_slice(sig.as_ref());
        }
        buf.extend_from_slice(&message);
        buf
    }
}
