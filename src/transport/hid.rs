use std::sync::Mutex;

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::TransportError;
use crate::transport::Transport;

const LEDGER_VID: u16 = 0x2c97;
const LEDGER_USAGE_PAGE: u16 = 0xFFA0;
const LEDGER_CHANNEL: u16 = 0x0101;
const LEDGER_TAG: u8 = 0x05;
const LEDGER_PACKET_WRITE_SIZE: usize = 65;
const LEDGER_PACKET_READ_SIZE: usize = 64;
const LEDGER_TIMEOUT_MS: i32 = 30_000;
/// Write report minus report id, channel, tag and sequence index.
const CHUNK_SIZE: usize = LEDGER_PACKET_WRITE_SIZE - 6;

/// Detected from the upper byte of the USB product ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    NanoS,
    NanoSPlus,
    NanoX,
    Flex,
    Stax,
    Unknown(u16),
}

impl DeviceType {
    /// `0x10` = Nano S, `0x40` = Nano X, `0x50` = Nano S+,
    /// `0x60` = Stax, `0x70` = Flex.
    pub fn from_product_id(pid: u16) -> Self {
        match pid >> 8 {
            0x10 => Self::NanoS,
            0x40 => Self::NanoX,
            0x50 => Self::NanoSPlus,
            0x60 => Self::Stax,
            0x70 => Self::Flex,
            _ => Self::Unknown(pid),
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NanoS => write!(f, "Nano S"),
            Self::NanoSPlus => write!(f, "Nano S+"),
            Self::NanoX => write!(f, "Nano X"),
            Self::Flex => write!(f, "Flex"),
            Self::Stax => write!(f, "Stax"),
            Self::Unknown(pid) => write!(f, "Unknown (0x{pid:04X})"),
        }
    }
}

/// Split an APDU into 65-byte HID write reports.
///
/// Report layout: `[0x00 report id][channel: u16 BE][tag][seq: u16 BE][chunk]`.
/// The APDU itself is prefixed with its `u16 BE` length before chunking.
pub(crate) fn frame_apdu(apdu: &[u8]) -> Vec<[u8; LEDGER_PACKET_WRITE_SIZE]> {
    let mut payload = Vec::with_capacity(2 + apdu.len());
    payload.extend_from_slice(&(apdu.len() as u16).to_be_bytes());
    payload.extend_from_slice(apdu);

    payload
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(seq_idx, chunk)| {
            let mut report = [0u8; LEDGER_PACKET_WRITE_SIZE];
            report[1..3].copy_from_slice(&LEDGER_CHANNEL.to_be_bytes());
            report[3] = LEDGER_TAG;
            report[4..6].copy_from_slice(&(seq_idx as u16).to_be_bytes());
            report[6..6 + chunk.len()].copy_from_slice(chunk);
            report
        })
        .collect()
}

/// Reassembles a response from 64-byte HID read reports.
#[derive(Debug, Default)]
pub(crate) struct Reassembler {
    expected_len: Option<usize>,
    next_seq: u16,
    buf: Vec<u8>,
}

impl Reassembler {
    /// Feed one report. Returns the full response once it is complete.
    pub(crate) fn push(&mut self, report: &[u8]) -> Result<Option<Vec<u8>>, TransportError> {
        if report.len() < 5 {
            return Err(TransportError::Comm(format!(
                "HID short read: got {} bytes",
                report.len()
            )));
        }

        let channel = u16::from_be_bytes([report[0], report[1]]);
        if channel != LEDGER_CHANNEL {
            return Err(TransportError::Comm("HID channel mismatch".into()));
        }
        if report[2] != LEDGER_TAG {
            return Err(TransportError::Comm("HID tag mismatch".into()));
        }

        let seq = u16::from_be_bytes([report[3], report[4]]);
        if seq != self.next_seq {
            return Err(TransportError::Comm(format!(
                "sequence mismatch: expected {}, got {seq}",
                self.next_seq
            )));
        }

        let body = match self.expected_len {
            Some(_) => &report[5..],
            None => {
                // First packet has a 2-byte length prefix before the data
                if report.len() < 7 {
                    return Err(TransportError::Comm(format!(
                        "HID short read: got {} bytes, need at least 7",
                        report.len()
                    )));
                }
                self.expected_len = Some(u16::from_be_bytes([report[5], report[6]]) as usize);
                &report[7..]
            }
        };

        let expected = self.expected_len.unwrap_or(0);
        let take = (expected - self.buf.len()).min(body.len());
        self.buf.extend_from_slice(&body[..take]);
        self.next_seq = self.next_seq.wrapping_add(1);

        if self.buf.len() >= expected {
            Ok(Some(std::mem::take(&mut self.buf)))
        } else {
            Ok(None)
        }
    }
}

pub struct HidTransport {
    device: Mutex<hidapi::HidDevice>,
    device_type: DeviceType,
}

impl HidTransport {
    pub fn new() -> Result<Self, TransportError> {
        let api = hidapi::HidApi::new().map_err(|e| TransportError::Comm(e.to_string()))?;

        let info = api
            .device_list()
            .find(|info| info.vendor_id() == LEDGER_VID && info.usage_page() == LEDGER_USAGE_PAGE)
            .ok_or(TransportError::DeviceNotFound)?;

        let device_type = DeviceType::from_product_id(info.product_id());
        let device = info
            .open_device(&api)
            .map_err(|e| TransportError::Comm(e.to_string()))?;
        log::info!("connected to Ledger {device_type}");

        Ok(Self {
            device: Mutex::new(device),
            device_type,
        })
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn read_response(device: &hidapi::HidDevice) -> Result<Vec<u8>, TransportError> {
        let mut report = [0u8; LEDGER_PACKET_READ_SIZE];
        let mut reassembler = Reassembler::default();

        loop {
            let n = device
                .read_timeout(&mut report, LEDGER_TIMEOUT_MS)
                .map_err(|e| TransportError::Comm(e.to_string()))?;
            if n == 0 {
                return Err(TransportError::Timeout(LEDGER_TIMEOUT_MS as u32));
            }
            if let Some(response) = reassembler.push(&report[..n])? {
                return Ok(response);
            }
        }
    }
}

impl Transport for HidTransport {
    fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let device = self
            .device
            .lock()
            .map_err(|e| TransportError::Comm(format!("mutex poisoned: {e}")))?;

        for report in frame_apdu(&command.serialize()) {
            device
                .write(&report)
                .map_err(|e| TransportError::Comm(e.to_string()))?;
        }

        let response = Self::read_response(&device)?;
        Ok(ApduAnswer::from_raw(response))
    }
}
