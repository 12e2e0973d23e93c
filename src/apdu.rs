//! APDU command and response types.
//!
//! The Solana app uses CLA `0xE0`. P1 selects on-device confirmation,
//! P2 carries the multi-APDU chunking flags.

pub const CLA: u8 = 0xE0;

pub const P1_NON_CONFIRM: u8 = 0x00;
pub const P1_CONFIRM: u8 = 0x01;

/// Set on every APDU that continues a previous one.
pub const P2_EXTEND: u8 = 0x01;
/// Set on every APDU that is followed by another one.
pub const P2_MORE: u8 = 0x02;

/// Short APDU LC limit.
pub const MAX_APDU_DATA: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    pub fn new(ins: Instruction) -> Self {
        Self::with_data(ins, P1_NON_CONFIRM, 0x00, Vec::new())
    }

    pub fn with_data(ins: Instruction, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla: CLA,
            ins: ins as u8,
            p1,
            p2,
            data,
        }
    }

    /// Wire format: `[CLA][INS][P1][P2][LC][DATA]`
    ///
    /// # Panics
    ///
    /// Panics if `data` exceeds 255 bytes. [`protocol`](crate::protocol)
    /// splits larger payloads before they get here.
    pub fn serialize(&self) -> Vec<u8> {
        assert!(
            self.data.len() <= MAX_APDU_DATA,
            "APDU data too long: {} bytes (max 255)",
            self.data.len()
        );
        let mut buf = Vec::with_capacity(5 + self.data.len());
        buf.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        buf.push(self.data.len() as u8);
        buf.extend_from_slice(&self.data);
        buf
    }
}

/// APDU response - last 2 bytes are the status word, everything before
/// that is the payload.
#[derive(Debug, Clone)]
pub struct ApduAnswer {
    raw: Vec<u8>,
}

impl ApduAnswer {
    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn retcode(&self) -> u16 {
        match self.raw.len() {
            0 | 1 => 0,
            len => u16::from_be_bytes([self.raw[len - 2], self.raw[len - 1]]),
        }
    }

    /// Payload only - strips the trailing 2-byte status word.
    pub fn data(&self) -> &[u8] {
        if self.raw.len() < 2 {
            return &[];
        }
        &self.raw[..self.raw.len() - 2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    GetAppConfiguration = 0x04,
    GetPubkey = 0x05,
    SignMessage = 0x06,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_empty_data() {
        let cmd = ApduCommand::new(Instruction::GetAppConfiguration);
        assert_eq!(cmd.serialize(), vec![0xE0, 0x04, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn serialize_with_flags() {
        let cmd = ApduCommand::with_data(
            Instruction::SignMessage,
            P1_CONFIRM,
            P2_EXTEND | P2_MORE,
            vec![0xAA, 0xBB],
        );
        assert_eq!(
            cmd.serialize(),
            vec![0xE0, 0x06, 0x01, 0x03, 0x02, 0xAA, 0xBB]
        );
    }

    #[test]
    fn serialize_max_255_bytes() {
        let cmd = ApduCommand::with_data(Instruction::SignMessage, 0, 0, vec![0xFF; 255]);
        let buf = cmd.serialize();
        assert_eq!(buf.len(), 5 + 255);
        assert_eq!(buf[4], 255);
    }

    #[test]
    #[should_panic(expected = "APDU data too long")]
    fn serialize_panics_at_256_bytes() {
        let cmd = ApduCommand::with_data(Instruction::SignMessage, 0, 0, vec![0x00; 256]);
        cmd.serialize();
    }

    #[test]
    fn retcode_short_responses() {
        assert_eq!(ApduAnswer::from_raw(vec![]).retcode(), 0);
        assert_eq!(ApduAnswer::from_raw(vec![0x90]).retcode(), 0);
    }

    #[test]
    fn retcode_with_payload() {
        let ans = ApduAnswer::from_raw(vec![0x01, 0x02, 0x03, 0x69, 0x85]);
        assert_eq!(ans.retcode(), 0x6985);
    }

    #[test]
    fn data_strips_status_word() {
        let ans = ApduAnswer::from_raw(vec![0xAA, 0xBB, 0xCC, 0x90, 0x00]);
        assert_eq!(ans.data(), &[0xAA, 0xBB, 0xCC]);
        assert!(ApduAnswer::from_raw(vec![0x90, 0x00]).data().is_empty());
        assert!(ApduAnswer::from_raw(vec![0x90]).data().is_empty());
    }
}
