use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::Duration;

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::TransportError;
use crate::transport::Transport;

const READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_LEN: usize = 65536;

/// TCP transport for the Speculos APDU server (default `127.0.0.1:9999`).
///
/// Wire: `[u32 BE length][APDU]` send, `[u32 BE length][response]` recv.
/// The status word follows the framed response as 2 bare bytes; we
/// stitch it back on so callers see a standard APDU answer.
pub struct TcpTransport {
    stream: Mutex<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .map_err(|e| TransportError::ConnectionFailed(format!("{addr}: {e}")))?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        log::info!("connected to Speculos at {addr}");
        Ok(Self {
            stream: Mutex::new(stream),
        })
    }
}

fn write_frame(stream: &mut impl Write, apdu: &[u8]) -> Result<(), TransportError> {
    stream.write_all(&(apdu.len() as u32).to_be_bytes())?;
    stream.write_all(apdu)?;
    stream.flush()?;
    Ok(())
}

fn read_answer(stream: &mut impl Read) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let resp_len = u32::from_be_bytes(len_buf) as usize;
    if resp_len > MAX_RESPONSE_LEN {
        return Err(TransportError::Comm(format!(
            "response too large: {resp_len} bytes (max {MAX_RESPONSE_LEN})"
        )));
    }

    // framed data followed by the bare status word
    let mut resp = vec![0u8; resp_len + 2];
    stream.read_exact(&mut resp)?;
    Ok(resp)
}

impl Transport for TcpTransport {
    fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let mut stream = self
            .stream
            .lock()
            .map_err(|e| TransportError::Comm(format!("mutex poisoned: {e}")))?;

        write_frame(&mut *stream, &command.serialize())?;
        let resp = read_answer(&mut *stream)?;
        Ok(ApduAnswer::from_raw(resp))
    }
}
