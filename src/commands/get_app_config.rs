use crate::apdu::{Instruction, P1_NON_CONFIRM};
use crate::error::LedgerError;
use crate::protocol;
use crate::transport::Transport;
use crate::types::AppConfiguration;

/// Response: `[blind_signing][pubkey_display][major][minor][patch]`
pub fn exec(transport: &dyn Transport) -> Result<AppConfiguration, LedgerError> {
    let result =
        protocol::execute(transport, Instruction::GetAppConfiguration, P1_NON_CONFIRM, &[])?;
    parse_config_response(&result)
}

pub(crate) fn parse_config_response(data: &[u8]) -> Result<AppConfiguration, LedgerError> {
    if data.len() < 5 {
        return Err(LedgerError::InvalidResponse(format!(
            "app configuration too short ({} bytes) - is the Solana app running?",
            data.len()
        )));
    }

    Ok(AppConfiguration {
        blind_signing_enabled: data[0] != 0,
        pubkey_display: data[1],
        major: data[2],
        minor: data[3],
        patch: data[4],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_config() {
        let cfg = parse_config_response(&[0x01, 0x00, 0x01, 0x04, 0x02]).unwrap();
        assert!(cfg.blind_signing_enabled);
        assert_eq!(cfg.pubkey_display, 0);
        assert_eq!((cfg.major, cfg.minor, cfg.patch), (1, 4, 2));
        assert_eq!(cfg.to_string(), "Solana v1.4.2 (blind signing on)");
    }

    #[test]
    fn blind_signing_off() {
        let cfg = parse_config_response(&[0x00, 0x01, 0x01, 0x00, 0x00]).unwrap();
        assert!(!cfg.blind_signing_enabled);
    }

    #[test]
    fn trailing_bytes_ignored() {
        let cfg = parse_config_response(&[0x00, 0x00, 0x01, 0x02, 0x03, 0xFF, 0xFF]).unwrap();
        assert_eq!((cfg.major, cfg.minor, cfg.patch), (1, 2, 3));
    }

    #[test]
    fn parse_too_short_response() {
        for len in 0..5 {
            let err = parse_config_response(&vec![0x01; len]).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidResponse(_)));
        }
    }
}
