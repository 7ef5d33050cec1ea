use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::channel::{ByteChannel, FrameKind};
use crate::error::{FrameError, Result};

/// Write one complete message, looping over partial writes.
///
/// Every call hands the channel the unsent remainder flagged as the end of the
/// message. Returns the number of `write` calls it took.
pub async fn send_message<C: ByteChannel>(
    channel: &mut C,
    payload: &[u8],
    kind: FrameKind,
    cancel: &CancellationToken,
) -> Result<usize> {
    send_fragment(channel, payload, kind, true, cancel).await
}

/// Write `payload` as explicit fragments of at most `fragment_size` bytes.
///
/// Only the last fragment ends the message. An empty payload is a single empty
/// final fragment. Returns the number of `write` calls it took.
pub async fn send_fragmented<C: ByteChannel>(
    channel: &mut C,
    payload: &[u8],
    kind: FrameKind,
    fragment_size: usize,
    cancel: &CancellationToken,
) -> Result<usize> {
    if fragment_size == 0 {
        return Err(FrameError::Protocol(
            "fragment size must be at least one byte".to_string(),
        ));
    }
    if payload.is_empty() {
        return send_message(channel, payload, kind, cancel).await;
    }

    let mut calls = 0;
    let mut chunks = payload.chunks(fragment_size).peekable();
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        calls += send_fragment(channel, chunk, kind, last, cancel).await?;
    }
    trace!(
        len = payload.len(),
        fragment_size,
        calls,
        "fragmented message sent"
    );
    Ok(calls)
}

async fn send_fragment<C: ByteChannel>(
    channel: &mut C,
    bytes: &[u8],
    kind: FrameKind,
    end_of_message: bool,
    cancel: &CancellationToken,
) -> Result<usize> {
    if bytes.is_empty() {
        channel.write(bytes, kind, end_of_message, cancel).await?;
        return Ok(1);
    }

    let mut offset = 0;
    let mut calls = 0;
    while offset < bytes.len() {
        let n = channel
            .write(&bytes[offset..], kind, end_of_message, cancel)
            .await?;
        calls += 1;
        if n > bytes.len() - offset {
            return Err(FrameError::Protocol(format!(
                "channel accepted {n} bytes of a {}-byte write",
                bytes.len() - offset
            )));
        }
        if n == 0 {
            tokio::task::yield_now().await;
            continue;
        }
        offset += n;
    }
    Ok(calls)
}
