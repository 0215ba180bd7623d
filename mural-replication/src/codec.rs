//! Framing for peer envelopes.
//!
//! Each connection carries at most one envelope per direction: a single JSON
//! object. Writers append `\n`, but readers stop at the first complete JSON
//! value, so a peer that sends bare JSON and waits for the answer is served
//! too, as is one that writes the JSON and closes.

use crate::error::{ReplicationError, Result};
use crate::types::PeerEnvelope;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_ENVELOPE_BYTES: u64 = 16 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

pub fn encode(envelope: &PeerEnvelope) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(envelope)?;
    buf.push(b'\n');
    Ok(buf)
}

pub async fn write_envelope<W>(writer: &mut W, envelope: &PeerEnvelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode(envelope)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read until the buffer holds one complete envelope, a newline, or EOF.
///
/// Bytes after the first JSON value are ignored.
pub async fn read_envelope<R>(reader: &mut R) -> Result<PeerEnvelope>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return match first_value(&buf) {
                Some(parsed) => Ok(parsed?),
                None => Err(ReplicationError::EmptyEnvelope),
            };
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() as u64 > MAX_ENVELOPE_BYTES {
            return Err(ReplicationError::EnvelopeTooLarge {
                max: MAX_ENVELOPE_BYTES,
            });
        }

        // A JSON object can only be complete once the buffer ends in `}`;
        // skip reparsing the whole buffer for every other chunk.
        if !chunk[..n].contains(&b'\n') && !ends_with_close_brace(&buf) {
            continue;
        }
        match first_value(&buf) {
            Some(Err(e)) if e.is_eof() => {}
            Some(parsed) => return Ok(parsed?),
            None => {}
        }
    }
}

fn first_value(buf: &[u8]) -> Option<serde_json::Result<PeerEnvelope>> {
    serde_json::Deserializer::from_slice(buf)
        .into_iter::<PeerEnvelope>()
        .next()
}

fn ends_with_close_brace(buf: &[u8]) -> bool {
    buf.iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'}')
}
