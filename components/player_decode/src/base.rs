//! Decoder base (§4.6): the message surface and the loop that drives it.
//!
//! Every decoder kind implements [`DecoderActor`] and is driven by
//! [`spawn_decoder_loop`], which owns the `mpsc` channel and the `tokio`
//! task. This mirrors the original's single-threaded per-decoder message
//! loop without duplicating the dispatch boilerplate in each decoder.

use std::sync::Arc;

use mediacore_types::{MediaFormat, PlayerError, VideoRenderSink};
use tokio::sync::{mpsc, oneshot};

/// Messages a decoder's loop accepts. The first block is the public
/// surface (§4.6); the second is internal plumbing a decoder posts to
/// itself — via a codec callback or a delayed retry — to keep all state
/// mutation inside the single loop.
pub enum DecoderCommand {
    /// Configures the decoder for a (possibly new) track format.
    Configure(MediaFormat),
    /// Swaps the video render sink (tunnel decoders only).
    SetVideoRender(Arc<dyn VideoRenderSink>),
    /// Starts pulling input and producing output.
    Start,
    /// Pauses the decoder; the sender is acknowledged once paused.
    Pause(oneshot::Sender<()>),
    /// Resumes a paused decoder.
    Resume,
    /// Discards buffered state without shutting the codec down.
    Flush,
    /// Tears the decoder down; the loop exits after processing this.
    Shutdown,

    /// A codec input buffer is ready to be filled.
    InputBufferAvailable(usize),
    /// A codec output buffer is ready to be consumed.
    OutputBufferAvailable(usize),
    /// The codec's output format changed.
    OutputFormatChanged(MediaFormat),
    /// The codec reported an unrecoverable error.
    CodecError(PlayerError),
    /// A delayed re-request after the source returned `WouldBlock`.
    RequestMoreInput,
    /// A render finished with a codec output buffer; the decoder must
    /// release it back to the codec with the reported `rendered` flag.
    OutputBufferReleased { index: usize, rendered: bool },
    /// A render finished consuming a forwarded aggregate chunk
    /// (passthrough only), tagged with the buffer generation it was
    /// issued under so replies from a pre-flush generation are ignored.
    BufferConsumed { generation: u64, bytes: usize },
}

/// Events a decoder's loop reports back to its owner (the player state
/// machine), outside the command/reply channel.
#[derive(Debug, Clone)]
pub enum DecoderEvent {
    /// An unrecoverable error occurred.
    Error(PlayerError),
    /// The video track's geometry changed.
    VideoSizeChanged(MediaFormat),
    /// The audio track's output format changed.
    AudioOutputFormatChanged(MediaFormat),
    /// The track reached end-of-stream.
    Eos,
}

/// A handle to a running decoder's message loop.
#[derive(Clone)]
pub struct DecoderHandle {
    tx: mpsc::UnboundedSender<DecoderCommand>,
}

impl DecoderHandle {
    /// Posts a command without waiting for it to be processed.
    pub fn post(&self, cmd: DecoderCommand) {
        // The loop only stops after Shutdown; a send error past that point
        // means the decoder already tore down, which is not an error the
        // caller needs to react to.
        let _ = self.tx.send(cmd);
    }

    /// Posts `Pause` and waits for the loop to acknowledge it, matching
    /// the synchronous post-and-wait pattern in §5.
    pub async fn pause(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.post(DecoderCommand::Pause(ack_tx));
        let _ = ack_rx.await;
    }
}

/// Implemented by each concrete decoder kind; holds all decoder state and
/// reacts to one command at a time.
pub trait DecoderActor: Send + 'static {
    /// Handles `cmd`. Returns `false` to stop the loop (only `Shutdown`
    /// should do this).
    fn handle(&mut self, cmd: DecoderCommand) -> bool;

    /// Gives the actor a sender it can clone into codec callbacks or
    /// delayed-retry tasks, so internal events re-enter the same loop as
    /// ordinary commands.
    fn bind_self_sender(&mut self, sender: mpsc::UnboundedSender<DecoderCommand>);
}

/// Spawns `actor`'s message loop on the current `tokio` runtime and
/// returns a handle to post commands to it.
pub fn spawn_decoder_loop<A: DecoderActor>(mut actor: A) -> DecoderHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    actor.bind_self_sender(tx.clone());
    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            if !actor.handle(cmd) {
                break;
            }
        }
    });
    DecoderHandle { tx }
}
