//! Core types: BIP32 derivation paths, app configuration, public key,
//! signature and blockhash.

use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{LedgerError, ParseError};

const HARDENED: u32 = 0x8000_0000;
const SOLANA_COIN_TYPE: u32 = 501;

/// BIP32 derivation path for Solana keys.
///
/// All components must be hardened and the path must start with
/// `44'/501'`. The Solana app accepts `44'/501'`, `44'/501'/account'`
/// and `44'/501'/account'/change'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Each component must already have the hardened bit set.
    pub fn new(components: Vec<u32>) -> Result<Self, LedgerError> {
        let path = Self(components);
        path.validate()?;
        Ok(path)
    }

    /// `44'/501'/account'` or `44'/501'/account'/change'`.
    #[must_use]
    pub fn solana(account: u32, change: Option<u32>) -> Self {
        let mut components = vec![44 | HARDENED, SOLANA_COIN_TYPE | HARDENED, account | HARDENED];
        if let Some(change) = change {
            components.push(change | HARDENED);
        }
        Self(components)
    }

    /// Wire format: `[n: u8][path[0]: u32 BE]...[path[n-1]: u32 BE]`
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 1 + self.0.len() * 4];
        buf[0] = self.0.len() as u8;
        for (chunk, &component) in buf[1..].chunks_exact_mut(4).zip(&self.0) {
            BigEndian::write_u32(chunk, component);
        }
        buf
    }

    fn validate(&self) -> Result<(), LedgerError> {
        if self.0.len() < 2 || self.0.len() > 5 {
            return Err(LedgerError::InvalidPath(format!(
                "path must have 2 to 5 components, got {}",
                self.0.len()
            )));
        }

        if self.0[0] != (44 | HARDENED) {
            return Err(LedgerError::InvalidPath(
                "first component must be 44'".into(),
            ));
        }

        if self.0[1] != (SOLANA_COIN_TYPE | HARDENED) {
            return Err(LedgerError::InvalidPath(
                "coin type must be 501'".into(),
            ));
        }

        for (i, &c) in self.0.iter().enumerate() {
            if c & HARDENED == 0 {
                return Err(LedgerError::InvalidPath(format!(
                    "component {i} must be hardened"
                )));
            }
        }

        Ok(())
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        Self::solana(0, None)
    }
}

/// Accepts `m/44'/501'/0'`, `44'/501'/0'` and `h` as the hardened marker.
impl FromStr for DerivationPath {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("m/")
            .unwrap_or(trimmed)
            .trim_end_matches('/');
        if body.is_empty() {
            return Err(LedgerError::InvalidPath("empty path".into()));
        }

        let mut components = Vec::new();
        for part in body.split('/') {
            let marker = part.strip_suffix('\'').or_else(|| part.strip_suffix('h'));
            let (digits, hardened) = match marker {
                Some(d) => (d, true),
                None => (part, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| LedgerError::InvalidPath(format!("bad component {part:?}")))?;
            if index & HARDENED != 0 {
                return Err(LedgerError::InvalidPath(format!(
                    "component {part:?} out of range"
                )));
            }
            components.push(if hardened { index | HARDENED } else { index });
        }

        Self::new(components)
    }
}

impl std::fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for &c in &self.0 {
            let val = c & !HARDENED;
            let h = if c & HARDENED != 0 { "'" } else { "" };
            write!(f, "/{val}{h}")?;
        }
        Ok(())
    }
}

/// `GET_APP_CONFIGURATION` answer from the Solana app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfiguration {
    pub blind_signing_enabled: bool,
    pub pubkey_display: u8,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl std::fmt::Display for AppConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Solana v{}.{}.{} (blind signing {})",
            self.major,
            self.minor,
            self.patch,
            if self.blind_signing_enabled { "on" } else { "off" }
        )
    }
}

/// 32-byte Ed25519 public key / account address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

/// 64-byte Ed25519 signature. The all-zero value marks an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

/// 32-byte blockhash a transaction is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hash(pub [u8; 32]);

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Pubkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

fn decode_base58<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| ParseError::InvalidBase58(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseError::WrongSize {
            expected: N,
            got: bytes.len(),
        })
}

impl FromStr for Pubkey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58(s).map(Self)
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58(s).map(Self)
    }
}

impl FromStr for Hash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58(s).map(Self)
    }
}

impl From<Pubkey> for solana_pubkey::Pubkey {
    fn from(pk: Pubkey) -> Self {
        Self::new_from_array(pk.to_bytes())
    }
}

impl From<solana_pubkey::Pubkey> for Pubkey {
    fn from(pk: solana_pubkey::Pubkey) -> Self {
        Self(pk.to_bytes())
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<Hash> for solana_hash::Hash {
    fn from(hash: Hash) -> Self {
        Self::new_from_array(hash.0)
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<solana_hash::Hash> for Hash {
    fn from(hash: solana_hash::Hash) -> Self {
        Self(hash.to_bytes())
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<Signature> for solana_signature::Signature {
    fn from(sig: Signature) -> Self {
        Self::from(sig.0)
    }
}

#[cfg(feature = "solana-sdk-types")]
impl From<solana_signature::Signature> for Signature {
    fn from(sig: solana_signature::Signature) -> Self {
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(sig.as_ref());
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_solana_path() {
        let path = DerivationPath::default();
        let bytes = path.serialize();
        assert_eq!(bytes[0], 3); // 3 components
                                 // 44' = 0x8000002C in big-endian
        assert_eq!(&bytes[1..5], &[0x80, 0x00, 0x00, 0x2C]);
        // 501' = 0x800001F5 in big-endian
        assert_eq!(&bytes[5..9], &[0x80, 0x00, 0x01, 0xF5]);
        assert_eq!(&bytes[9..13], &[0x80, 0x00, 0x00, 0x00]);
        assert_eq!(path.to_string(), "m/44'/501'/0'");
    }

    #[test]
    fn path_with_change() {
        let path = DerivationPath::solana(2, Some(0));
        assert_eq!(path.serialize().len(), 1 + 4 * 4);
        assert_eq!(path.to_string(), "m/44'/501'/2'/0'");
    }

    #[test]
    fn parse_path_forms() {
        let expected = DerivationPath::default();
        assert_eq!("44'/501'/0'".parse::<DerivationPath>().unwrap(), expected);
        assert_eq!("m/44'/501'/0'".parse::<DerivationPath>().unwrap(), expected);
        assert_eq!("m/44h/501h/0h".parse::<DerivationPath>().unwrap(), expected);
    }

    #[test]
    fn parse_path_rejects_garbage() {
        assert!("".parse::<DerivationPath>().is_err());
        assert!("m/".parse::<DerivationPath>().is_err());
        assert!("44'/abc'/0'".parse::<DerivationPath>().is_err());
        assert!("44'/501'/4294967295'".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn wrong_coin_type_rejected() {
        let result = DerivationPath::new(vec![44 | HARDENED, 4218 | HARDENED]);
        assert!(result.is_err());
    }

    #[test]
    fn non_hardened_rejected() {
        assert!("44'/501'/0".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn too_short_rejected() {
        assert!(DerivationPath::new(vec![44 | HARDENED]).is_err());
    }

    #[test]
    fn system_program_is_all_ones() {
        assert_eq!(
            Pubkey::default().to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn pubkey_base58_roundtrip() {
        let s = "BwqrghZA2htAcqq8dzP1WDAhTXYTYWj7CHxF5j7TDBAe";
        let pk: Pubkey = s.parse().unwrap();
        assert_eq!(pk.to_string(), s);
    }

    #[test]
    fn pubkey_wrong_length() {
        let err = "3yZe7d".parse::<Pubkey>().unwrap_err();
        assert!(matches!(err, ParseError::WrongSize { expected: 32, .. }));
    }

    #[test]
    fn pubkey_invalid_alphabet() {
        // '0' and 'l' are not in the base58 alphabet
        let err = "0l0l".parse::<Pubkey>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidBase58(_)));
    }

    #[test]
    fn solana_pubkey_conversion_keeps_bytes() {
        let pk: Pubkey = "BwqrghZA2htAcqq8dzP1WDAhTXYTYWj7CHxF5j7TDBAe".parse().unwrap();
        let sdk = solana_pubkey::Pubkey::from(pk);
        assert_eq!(sdk.to_string(), pk.to_string());
        assert_eq!(Pubkey::from(sdk), pk);
    }

    #[test]
    fn path_with_five_components() {
        let path = DerivationPath::new(vec![
            44 | HARDENED,
            SOLANA_COIN_TYPE | HARDENED,
            HARDENED,
            HARDENED,
            1 | HARDENED,
        ])
        .unwrap();
        let bytes = path.serialize();
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], 5);
        assert_eq!(&bytes[17..21], &[0x80, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn default_signature_is_empty() {
        assert!(Signature::default().is_empty());
        let mut sig = Signature::default();
        sig.0[10] = 1;
        assert!(!sig.is_empty());
    }
}
