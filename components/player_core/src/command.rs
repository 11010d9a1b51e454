//! The message surface for the player state machine's loop (§4.11):
//! external commands and content-source notifications share one channel,
//! per §5's "Source notifications are delivered to the same loop".

use std::sync::Arc;

use mediacore_types::{
    MediaFormat, PlayerError, PlayerResult, SeekMode, SourceFlags, SourceNotify, TrackType,
    VideoRenderSink,
};
use mediacore_decode::DecoderEvent;
use tokio::sync::{mpsc, oneshot};

use crate::state::FlushCommand;

/// External commands plus source notifications plus internal plumbing,
/// all dispatched from the single player loop.
pub enum PlayerCommand {
    /// Sets the data source URI; must precede `Prepare`.
    SetDataSource(String),
    /// Begins preparing (probing) the source.
    Prepare,
    /// Starts (or requests starting) playback.
    Start,
    /// Stops playback and releases decoders.
    Stop,
    /// Pauses playback; the sender is acknowledged once paused.
    Pause(oneshot::Sender<()>),
    /// Resumes playback.
    Resume,
    /// Seeks to `pts_us` using `mode`; replies with the outcome.
    Seek(i64, SeekMode, oneshot::Sender<PlayerResult<()>>),
    /// Tears everything down and returns to the pre-`SetDataSource` state.
    Reset,
    /// Swaps (or sets for the first time) the video render sink.
    SetVideoSink(Arc<dyn VideoRenderSink>),

    /// The source finished (or failed) preparing.
    SourcePrepared(PlayerResult<()>),
    /// The source's capability flags changed.
    FlagsChanged(SourceFlags),
    /// The video track's geometry changed, as reported by the source.
    SourceVideoSizeChanged(MediaFormat),
    /// Buffering has started.
    BufferingStart,
    /// Buffering progress, 0-100.
    BufferingUpdate(i32),
    /// Buffering has ended.
    BufferingEnd,
    /// The source reports all tracks complete.
    SourceCompletion,
    /// The source hit an unrecoverable error.
    SourceError(PlayerError),
    /// The source wants more data pumped for `track_type`.
    FetchData(TrackType),

    /// A decoder pipeline reported an event.
    Decoder(TrackType, DecoderEvent),
    /// Re-scans for tracks/sinks not yet bound to a decoder; no-ops if
    /// `generation` is stale relative to the player's current one.
    ScanSources(u64),
    /// Duration polling placeholder (§9): no real source in this core
    /// reports a dynamic duration yet, so this has nowhere to route to.
    /// TODO: wire into `SourceFlags::DYNAMIC_DURATION` once a source that
    /// sets that flag exists.
    PollDuration,
}

/// A deferred action queued by seek/reset/sink-change choreography (§4.11).
/// Runs only while every track's flush status is terminal.
pub enum DeferredAction {
    /// Issues `audio`/`video` flush (or shutdown) commands to the
    /// respective decoder pipelines.
    Flush {
        /// Command for the audio pipeline, if one exists.
        audio: FlushCommand,
        /// Command for the video pipeline, if one exists.
        video: FlushCommand,
    },
    /// Seeks the content source.
    SeekSource {
        /// Target timestamp.
        pts_us: i64,
        /// Seek mode.
        mode: SeekMode,
    },
    /// Resumes decoders after a flush completes.
    ResumeDecoders {
        /// Whether to notify the listener once resumed (unused beyond
        /// forwarding; kept for parity with the source design).
        notify: bool,
    },
    /// Drops the source and returns to the idle state.
    PerformReset,
    /// Swaps the video render sink after a structural flush.
    SetVideoRenderSink(Arc<dyn VideoRenderSink>),
    /// Re-scans for newly available tracks/sinks.
    ScanSources,
}

/// Bridges [`SourceNotify`] callbacks (possibly invoked from a foreign
/// thread/task) into ordinary [`PlayerCommand`]s on the player's own loop,
/// so all state mutation happens in one place.
pub struct NotifyBridge {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl NotifyBridge {
    /// Creates a bridge posting into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<PlayerCommand>) -> Self {
        Self { tx }
    }
}

impl SourceNotify for NotifyBridge {
    fn on_prepared(&self, result: PlayerResult<()>) {
        let _ = self.tx.send(PlayerCommand::SourcePrepared(result));
    }
    fn on_flags_changed(&self, flags: SourceFlags) {
        let _ = self.tx.send(PlayerCommand::FlagsChanged(flags));
    }
    fn on_video_size_changed(&self, format: MediaFormat) {
        let _ = self.tx.send(PlayerCommand::SourceVideoSizeChanged(format));
    }
    fn on_buffering_start(&self) {
        let _ = self.tx.send(PlayerCommand::BufferingStart);
    }
    fn on_buffering_update(&self, percent: i32) {
        let _ = self.tx.send(PlayerCommand::BufferingUpdate(percent));
    }
    fn on_buffering_end(&self) {
        let _ = self.tx.send(PlayerCommand::BufferingEnd);
    }
    fn on_completion(&self) {
        let _ = self.tx.send(PlayerCommand::SourceCompletion);
    }
    fn on_error(&self, err: PlayerError) {
        let _ = self.tx.send(PlayerCommand::SourceError(err));
    }
    fn on_fetch_data(&self, track_type: TrackType) {
        let _ = self.tx.send(PlayerCommand::FetchData(track_type));
    }
}
