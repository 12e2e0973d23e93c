//! Legacy Solana message compilation and wire encoding.
//!
//! Instructions name their accounts by key; compilation folds every key
//! into one ordered account list and rewrites the instructions to index
//! into it.
//!
//! # Account ordering
//!
//! - fee payer first
//! - then writable signers, readonly signers, writable non-signers,
//!   readonly non-signers (program ids land in the last group)
//! - ties within a group broken by raw key bytes
//!
//! The same instructions, payer and blockhash always compile to the same
//! bytes.

use std::collections::BTreeMap;

use crate::error::TxError;
use crate::types::{Hash, Pubkey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program call before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyFlags {
    signer: bool,
    writable: bool,
}

impl Message {
    /// Compile with an all-zero blockhash; stamp the real one with
    /// [`Message::new_with_blockhash`] or by assigning `recent_blockhash`.
    pub fn new(instructions: &[Instruction], payer: Option<&Pubkey>) -> Result<Self, TxError> {
        Self::new_with_blockhash(instructions, payer, &Hash::default())
    }

    pub fn new_with_blockhash(
        instructions: &[Instruction],
        payer: Option<&Pubkey>,
        blockhash: &Hash,
    ) -> Result<Self, TxError> {
        let mut flags: BTreeMap<Pubkey, KeyFlags> = BTreeMap::new();
        for ix in instructions {
            flags.entry(ix.program_id).or_default();
            for meta in &ix.accounts {
                let entry = flags.entry(meta.pubkey).or_default();
                entry.signer |= meta.is_signer;
                entry.writable |= meta.is_writable;
            }
        }
        if let Some(payer) = payer {
            flags.remove(payer);
        }

        let group = |signer: bool, writable: bool| -> Vec<Pubkey> {
            flags
                .iter()
                .filter(|(_, f)| f.signer == signer && f.writable == writable)
                .map(|(k, _)| *k)
                .collect()
        };
        let writable_signers = group(true, true);
        let readonly_signers = group(true, false);
        let writable_unsigned = group(false, true);
        let readonly_unsigned = group(false, false);

        let payer_count = usize::from(payer.is_some());
        let mut account_keys = Vec::with_capacity(payer_count + flags.len());
        account_keys.extend(payer.copied());
        account_keys.extend(&writable_signers);
        account_keys.extend(&readonly_signers);
        account_keys.extend(&writable_unsigned);
        account_keys.extend(&readonly_unsigned);

        if account_keys.len() > 256 {
            return Err(TxError::TooManyAccounts(account_keys.len()));
        }
        for ix in instructions {
            let longest = ix.accounts.len().max(ix.data.len());
            if longest > MAX_SHORTVEC_LEN {
                return Err(TxError::LengthOverflow(longest));
            }
        }

        let header = MessageHeader {
            num_required_signatures: (payer_count + writable_signers.len() + readonly_signers.len())
                as u8,
            num_readonly_signed_accounts: readonly_signers.len() as u8,
            num_readonly_unsigned_accounts: readonly_unsigned.len() as u8,
        };

        let index_of = |key: &Pubkey| -> u8 {
            // every key was inserted above and the list fits in a u8
            account_keys.iter().position(|k| k == key).unwrap_or(0) as u8
        };
        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash: *blockhash,
            instructions,
        })
    }

    /// Keys whose signatures the transaction must carry, in slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.signer_keys().first()
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let h = &self.header;
        let signed = h.num_required_signatures as usize;
        if index >= self.account_keys.len() {
            return false;
        }
        if index < signed {
            index < signed - h.num_readonly_signed_accounts as usize
        } else {
            index < self.account_keys.len() - h.num_readonly_unsigned_accounts as usize
        }
    }

    /// The bytes a signer signs.
    ///
    /// `[header: 3][shortvec keys][blockhash: 32][shortvec instructions]`,
    /// each instruction `[program index][shortvec account indices][shortvec data]`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + 1 + self.account_keys.len() * 32 + 32 + 64);

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed_accounts);
        buf.push(self.header.num_readonly_unsigned_accounts);

        encode_shortvec_len(self.account_keys.len(), &mut buf);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }

        buf.extend_from_slice(self.recent_blockhash.as_ref());

        encode_shortvec_len(self.instructions.len(), &mut buf);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            encode_shortvec_len(ix.accounts.len(), &mut buf);
            buf.extend_from_slice(&ix.accounts);
            encode_shortvec_len(ix.data.len(), &mut buf);
            buf.extend_from_slice(&ix.data);
        }

        buf
    }
}

/// Largest length a compact-u16 prefix can carry.
pub const MAX_SHORTVEC_LEN: usize = u16::MAX as usize;

/// Compact-u16 length prefix: 7 bits per byte, high bit set on all but
/// the last byte.
///
/// Lengths above [`MAX_SHORTVEC_LEN`] are rejected when a message is
/// compiled and never reach this point.
pub fn encode_shortvec_len(len: usize, buf: &mut Vec<u8>) {
    debug_assert!(len <= MAX_SHORTVEC_LEN, "shortvec length {len} overflows u16");
    let mut rem = len as u16;
    loop {
        let mut byte = (rem & 0x7F) as u8;
        rem >>= 7;
        if rem == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<&AccountMeta> for solana_instruction::AccountMeta {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            pubkey: meta.pubkey.into(),
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<&Instruction> for solana_instruction::Instruction {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id.into(),
            accounts: ix.accounts.iter().map(Into::into).collect(),
            data: ix.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Pubkey {
        Pubkey([b; 32])
    }

    fn shortvec(len: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_shortvec_len(len, &mut buf);
        buf
    }

    #[test]
    fn shortvec_encoding() {
        assert_eq!(shortvec(0), vec![0x00]);
        assert_eq!(shortvec(0x7F), vec![0x7F]);
        assert_eq!(shortvec(0x80), vec![0x80, 0x01]);
        assert_eq!(shortvec(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(shortvec(0x4000), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn account_groups_ordering() {
        let payer = key(9);
        let program = key(5);
        let ix = Instruction {
            program_id: program,
            accounts: vec![
                AccountMeta::new_readonly(key(1), false),
                AccountMeta::new(key(3), false),
                AccountMeta::new_readonly(key(7), true),
                AccountMeta::new(key(8), true),
                AccountMeta::new(key(2), false),
            ],
            data: vec![],
        };

        let msg = Message::new(&[ix], Some(&payer)).unwrap();
        assert_eq!(
            msg.account_keys,
            vec![payer, key(8), key(7), key(2), key(3), key(1), program]
        );
        assert_eq!(
            msg.header,
            MessageHeader {
                num_required_signatures: 3,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 2,
            }
        );
        assert!(msg.is_writable(0));
        assert!(msg.is_writable(1));
        assert!(!msg.is_writable(2));
        assert!(msg.is_writable(4));
        assert!(!msg.is_writable(5));
        assert!(!msg.is_writable(6));
        assert_eq!(msg.instructions[0].program_id_index, 6);
        assert_eq!(msg.instructions[0].accounts, vec![5, 4, 2, 1, 3]);
    }

    #[test]
    fn duplicate_keys_merge_flags() {
        let payer = key(1);
        let ix = Instruction {
            program_id: key(4),
            accounts: vec![
                AccountMeta::new_readonly(key(2), false),
                AccountMeta::new(key(2), false),
                AccountMeta::new_readonly(payer, true),
            ],
            data: vec![0xAA],
        };

        let msg = Message::new(&[ix], Some(&payer)).unwrap();
        assert_eq!(msg.account_keys, vec![payer, key(2), key(4)]);
        assert_eq!(msg.header.num_required_signatures, 1);
        assert!(msg.is_writable(0));
        assert!(msg.is_writable(1));
        assert_eq!(msg.instructions[0].accounts, vec![1, 1, 0]);
    }

    #[test]
    fn serialized_layout() {
        let payer = key(1);
        let ix = Instruction {
            program_id: key(2),
            accounts: vec![AccountMeta::new(payer, true)],
            data: vec![0xDE, 0xAD],
        };
        let blockhash = Hash([0x33; 32]);
        let msg = Message::new_with_blockhash(&[ix], Some(&payer), &blockhash).unwrap();
        let bytes = msg.serialize();

        assert_eq!(&bytes[..3], &[1, 0, 1]);
        assert_eq!(bytes[3], 2);
        assert_eq!(&bytes[4..36], &[1; 32]);
        assert_eq!(&bytes[36..68], &[2; 32]);
        assert_eq!(&bytes[68..100], &[0x33; 32]);
        // one instruction: program 1, accounts [0], data len 2
        assert_eq!(&bytes[100..], &[1, 1, 1, 0, 2, 0xDE, 0xAD]);
    }

    #[test]
    fn compilation_is_deterministic() {
        let ix = Instruction {
            program_id: key(6),
            accounts: vec![AccountMeta::new(key(1), true), AccountMeta::new(key(2), false)],
            data: b"payload".to_vec(),
        };
        let blockhash = Hash([0x44; 32]);
        let a = Message::new_with_blockhash(&[ix.clone()], Some(&key(1)), &blockhash).unwrap();
        let b = Message::new_with_blockhash(&[ix], Some(&key(1)), &blockhash).unwrap();
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn blockhash_changes_bytes() {
        let ix = Instruction {
            program_id: key(6),
            accounts: vec![AccountMeta::new(key(1), true)],
            data: vec![],
        };
        let a = Message::new_with_blockhash(&[ix.clone()], Some(&key(1)), &Hash([1; 32])).unwrap();
        let b = Message::new_with_blockhash(&[ix], Some(&key(1)), &Hash([2; 32])).unwrap();
        assert_ne!(a.serialize(), b.serialize());
    }

    #[test]
    fn no_payer_puts_signers_first() {
        let ix = Instruction {
            program_id: key(9),
            accounts: vec![AccountMeta::new(key(5), false), AccountMeta::new(key(6), true)],
            data: vec![],
        };
        let msg = Message::new(&[ix], None).unwrap();
        assert_eq!(msg.account_keys[0], key(6));
        assert_eq!(msg.signer_keys(), &[key(6)]);
        assert_eq!(msg.fee_payer(), Some(&key(6)));
    }

    #[test]
    fn oversized_instruction_data_rejected() {
        let ix = Instruction {
            program_id: key(6),
            accounts: vec![AccountMeta::new(key(1), true)],
            data: vec![0x55; 70_012],
        };
        let err = Message::new(&[ix], Some(&key(1))).unwrap_err();
        assert_eq!(err, TxError::LengthOverflow(70_012));
    }

    #[test]
    fn largest_shortvec_length_still_compiles() {
        let ix = Instruction {
            program_id: key(6),
            accounts: vec![AccountMeta::new(key(1), true)],
            data: vec![0x55; MAX_SHORTVEC_LEN],
        };
        let bytes = Message::new(&[ix], Some(&key(1))).unwrap().serialize();
        // program index, 1 account index, then the data prefix
        let prefix_at = 3 + 1 + 2 * 32 + 32 + 1 + 1 + 2;
        assert_eq!(&bytes[prefix_at..prefix_at + 3], &[0xFF, 0xFF, 0x03]);
    }

    #[test]
    fn too_many_accounts_rejected() {
        let accounts = (0..300u32)
            .map(|i| {
                let mut k = [0u8; 32];
                k[..4].copy_from_slice(&i.to_le_bytes());
                k[31] = 1;
                AccountMeta::new_readonly(Pubkey(k), false)
            })
            .collect();
        let ix = Instruction {
            program_id: key(0xEE),
            accounts,
            data: vec![],
        };
        let err = Message::new(&[ix], Some(&key(0xAA))).unwrap_err();
        assert!(matches!(err, TxError::TooManyAccounts(302)));
    }
}
