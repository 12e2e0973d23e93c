//! High-level API - [`LedgerSolana`] wraps a transport connection and
//! exposes the Solana app operations the enrollment needs.

use crate::commands;
use crate::error::LedgerError;
use crate::transport::{self, Transport, TransportType};
use crate::types::{AppConfiguration, DerivationPath, Pubkey, Signature};

const MIN_VERSION: (u8, u8, u8) = (1, 0, 0);

/// A device that holds a key and signs with it.
///
/// [`LedgerSolana`] is the real implementation; tests plug in software
/// keys.
pub trait DeviceSigner {
    /// Public key at `path`. With `display` set the device asks the
    /// user to confirm the address first.
    fn pubkey(&self, path: &DerivationPath, display: bool) -> Result<Pubkey, LedgerError>;

    /// Ed25519 signature over `message` with the key at `path`.
    fn sign_message(&self, path: &DerivationPath, message: &[u8]) -> Result<Signature, LedgerError>;
}

/// High-level interface to the Solana Ledger app.
pub struct LedgerSolana {
    transport: Box<dyn Transport>,
}

impl LedgerSolana {
    /// Connect to a Ledger device and check the Solana app answers.
    pub fn new(transport_type: &TransportType) -> Result<Self, LedgerError> {
        let transport = transport::open(transport_type)?;
        let ledger = Self { transport };

        let config = ledger.get_app_config()?;
        if !version_ok(&config) {
            return Err(LedgerError::InvalidResponse(format!(
                "app {config} is too old - update to at least {}.{}.{}",
                MIN_VERSION.0, MIN_VERSION.1, MIN_VERSION.2,
            )));
        }
        log::info!("Solana app ready: {config}");
        if !config.blind_signing_enabled {
            log::warn!("blind signing is off; the device may refuse custom program instructions");
        }

        Ok(ledger)
    }

    /// Useful for testing or injecting a custom transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Query the app configuration and version.
    pub fn get_app_config(&self) -> Result<AppConfiguration, LedgerError> {
        commands::get_app_config::exec(self.transport.as_ref())
    }

    /// Derive the public key for the given path without prompting.
    pub fn get_pubkey(&self, path: &DerivationPath) -> Result<Pubkey, LedgerError> {
        commands::get_pubkey::exec(self.transport.as_ref(), path, false)
    }

    /// Shows the address on device and waits for user confirmation.
    pub fn verify_address(&self, path: &DerivationPath) -> Result<Pubkey, LedgerError> {
        commands::get_pubkey::exec(self.transport.as_ref(), path, true)
    }

    /// Sign a serialized transaction message. Blocks until the user
    /// approves or rejects on the device.
    pub fn sign_tx(&self, message: &[u8], path: &DerivationPath) -> Result<Signature, LedgerError> {
        commands::sign_message::exec(self.transport.as_ref(), path, message)
    }

    /// Check whether the Solana app is currently open on the device.
    pub fn is_app_open(&self) -> bool {
        self.get_app_config().is_ok()
    }
}

impl DeviceSigner for LedgerSolana {
    fn pubkey(&self, path: &DerivationPath, display: bool) -> Result<Pubkey, LedgerError> {
        if display {
            self.verify_address(path)
        } else {
            self.get_pubkey(path)
        }
    }

    fn sign_message(
        &self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<Signature, LedgerError> {
        self.sign_tx(message, path)
    }
}

fn version_ok(c: &AppConfiguration) -> bool {
    (c.major, c.minor, c.patch) >= MIN_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{ApduAnswer, ApduCommand, P1_CONFIRM, P2_EXTEND, P2_MORE};
    use crate::error::TransportError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned answers and records every command it was sent.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        answers: Arc<Mutex<VecDeque<Vec<u8>>>>,
        sent: Arc<Mutex<Vec<ApduCommand>>>,
    }

    impl ScriptedTransport {
        fn reply(self, data: &[u8], sw: u16) -> Self {
            let mut raw = data.to_vec();
            raw.extend_from_slice(&sw.to_be_bytes());
            self.answers.lock().unwrap().push_back(raw);
            self
        }

        fn sent(&self) -> Vec<ApduCommand> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
            self.sent.lock().unwrap().push(command.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .map(ApduAnswer::from_raw)
                .ok_or_else(|| TransportError::Comm("script exhausted".into()))
        }
    }

    fn config(major: u8, minor: u8, patch: u8) -> AppConfiguration {
        AppConfiguration {
            blind_signing_enabled: true,
            pubkey_display: 0,
            major,
            minor,
            patch,
        }
    }

    #[test]
    fn version_ok_exact_minimum() {
        assert!(version_ok(&config(1, 0, 0)));
    }

    #[test]
    fn version_ok_above_minimum() {
        assert!(version_ok(&config(1, 0, 1)));
        assert!(version_ok(&config(1, 10, 0)));
        assert!(version_ok(&config(2, 0, 0)));
    }

    #[test]
    fn version_ok_below_minimum() {
        assert!(!version_ok(&config(0, 9, 9)));
        assert!(!version_ok(&config(0, 0, 0)));
    }

    #[test]
    fn get_pubkey_sends_path() {
        let script = ScriptedTransport::default().reply(&[0x42; 32], 0x9000);
        let ledger = LedgerSolana::with_transport(Box::new(script.clone()));

        let path = DerivationPath::default();
        let pk = ledger.get_pubkey(&path).unwrap();
        assert_eq!(pk, Pubkey([0x42; 32]));

        let sent = script.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ins, 0x05);
        assert_eq!(sent[0].p1, 0x00);
        assert_eq!(sent[0].data, path.serialize());
    }

    #[test]
    fn verify_address_asks_for_confirmation() {
        let script = ScriptedTransport::default().reply(&[0x42; 32], 0x9000);
        let ledger = LedgerSolana::with_transport(Box::new(script.clone()));

        DeviceSigner::pubkey(&ledger, &DerivationPath::default(), true).unwrap();
        assert_eq!(script.sent()[0].p1, P1_CONFIRM);
    }

    #[test]
    fn long_message_signed_in_chunks() {
        let script = ScriptedTransport::default()
            .reply(&[], 0x9000)
            .reply(&[0x5A; 64], 0x9000);
        let ledger = LedgerSolana::with_transport(Box::new(script.clone()));

        let message = vec![0x01; 300];
        let sig = ledger
            .sign_tx(&message, &DerivationPath::default())
            .unwrap();
        assert_eq!(sig, Signature([0x5A; 64]));

        let sent = script.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].p2, P2_MORE);
        assert_eq!(sent[1].p2, P2_EXTEND);
        // 1 signer byte + 13 path bytes + 300 message bytes
        assert_eq!(sent[0].data.len() + sent[1].data.len(), 314);
        assert_eq!(sent[0].data[0], 1);
    }

    #[test]
    fn user_rejection_surfaces() {
        let script = ScriptedTransport::default().reply(&[], 0x6985);
        let ledger = LedgerSolana::with_transport(Box::new(script));
        let err = ledger
            .sign_tx(b"msg", &DerivationPath::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::UserRejected));
    }

    #[test]
    fn rejection_mid_stream_stops_sending() {
        let script = ScriptedTransport::default().reply(&[], 0x6A81);
        let ledger = LedgerSolana::with_transport(Box::new(script.clone()));
        let err = ledger
            .sign_tx(&[0u8; 600], &DerivationPath::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMessage));
        assert_eq!(script.sent().len(), 1);
    }

    #[test]
    fn app_config_roundtrip() {
        let script = ScriptedTransport::default().reply(&[0, 0, 1, 3, 0], 0x9000);
        let ledger = LedgerSolana::with_transport(Box::new(script));
        let cfg = ledger.get_app_config().unwrap();
        assert_eq!((cfg.major, cfg.minor, cfg.patch), (1, 3, 0));
        assert!(!cfg.blind_signing_enabled);
    }

    #[test]
    fn wrong_app_means_not_open() {
        let script = ScriptedTransport::default().reply(&[], 0x6E00);
        let ledger = LedgerSolana::with_transport(Box::new(script));
        assert!(!ledger.is_app_open());
    }
}
