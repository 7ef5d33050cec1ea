use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsbench_transport::ReplayStream;

use crate::channel::{FrameKind, Role};
use crate::codec::{encoded_frame_len, FrameConfig};
use crate::error::Result;
use crate::framed::FramedChannel;
use crate::writer::send_message;

/// A framed channel over a [`ReplayStream`].
///
/// Every read is served from a captured frame sequence that repeats forever,
/// so a receive loop over it never waits on a peer and never sees the stream
/// end. Message counts observed through it are meaningless.
pub type CyclicReplayChannel = FramedChannel<ReplayStream>;

impl FramedChannel<ReplayStream> {
    /// Replay an existing capture of encoded frames.
    pub fn replay(template: impl AsRef<[u8]>, role: Role) -> Result<Self> {
        let stream = ReplayStream::new(template)?;
        Ok(FramedChannel::new(stream, role))
    }

    /// Capture one `kind` message carrying `payload`, then replay it.
    ///
    /// The message is encoded as `role`'s peer would send it, into a stream
    /// sized exactly for one frame.
    pub async fn record(payload: &[u8], kind: FrameKind, role: Role) -> Result<Self> {
        let capacity = encoded_frame_len(payload.len());
        let config = FrameConfig {
            max_frame_payload: usize::MAX,
            ..FrameConfig::default()
        };
        let stream = ReplayStream::with_capacity(capacity)?;
        let mut sender = FramedChannel::with_config(stream, role.peer(), config);
        send_message(&mut sender, payload, kind, &CancellationToken::new()).await?;

        let mut stream = sender.into_inner();
        stream.rewind();
        debug!(
            payload = payload.len(),
            template = stream.template().len(),
            %role,
            "replay template recorded"
        );
        Ok(FramedChannel::new(stream, role))
    }

    /// The captured frame bytes being replayed.
    pub fn template(&self) -> &[u8] {
        self.get_ref().template()
    }
}
