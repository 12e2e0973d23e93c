//! Multi-APDU exchanges with the Solana app.
//!
//! Payloads longer than one short APDU get split into 255-byte chunks.
//! Every chunk but the last carries `P2_MORE`, every chunk but the first
//! carries `P2_EXTEND`. The device only answers with data on the final
//! chunk; intermediate chunks are acknowledged with a bare `0x9000`.

use crate::apdu::{ApduAnswer, ApduCommand, Instruction, MAX_APDU_DATA, P2_EXTEND, P2_MORE};
use crate::error::{LedgerError, StatusWord};
use crate::transport::Transport;

/// Split `payload` into APDUs with the right P2 flags.
///
/// An empty payload still produces a single APDU.
pub fn chunk_payload(ins: Instruction, p1: u8, payload: &[u8]) -> Vec<ApduCommand> {
    if payload.is_empty() {
        return vec![ApduCommand::with_data(ins, p1, 0x00, Vec::new())];
    }

    let chunks: Vec<&[u8]> = payload.chunks(MAX_APDU_DATA).collect();
    let last = chunks.len() - 1;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut p2 = 0x00;
            if i > 0 {
                p2 |= P2_EXTEND;
            }
            if i < last {
                p2 |= P2_MORE;
            }
            ApduCommand::with_data(ins, p1, p2, chunk.to_vec())
        })
        .collect()
}

/// Send `payload` for `ins` and return the data of the final answer.
///
/// Any non-`0x9000` status aborts the exchange, including on
/// intermediate chunks.
pub fn execute(
    transport: &dyn Transport,
    ins: Instruction,
    p1: u8,
    payload: &[u8],
) -> Result<Vec<u8>, LedgerError> {
    let commands = chunk_payload(ins, p1, payload);
    log::debug!(
        "{ins:?}: {} payload bytes in {} APDU(s)",
        payload.len(),
        commands.len()
    );

    let mut answer: Option<ApduAnswer> = None;
    for cmd in &commands {
        let reply = transport.exchange(cmd)?;
        log::trace!("sw {:04x} <= {}", reply.retcode(), hex::encode(reply.data()));
        check_status(&reply)?;
        answer = Some(reply);
    }

    answer
        .map(|a| a.data().to_vec())
        .ok_or_else(|| LedgerError::InvalidResponse("no answer from device".into()))
}

fn check_status(answer: &ApduAnswer) -> Result<(), LedgerError> {
    let code = answer.retcode();
    if StatusWord::is_success(code) {
        Ok(())
    } else {
        Err(LedgerError::from_status(code))
    }
}
