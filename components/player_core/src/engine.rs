//! Player State Machine (§4.11): the top-level orchestrator. Owns the
//! source, the AVSync controller, the audio device, the codec factory, and
//! up to two decoder pipelines (audio, video) with their renders. Runs on
//! its own message loop, matching §5's one-loop-per-component model.

use std::collections::VecDeque;
use std::sync::Arc;

use mediacore_decode::{
    select_decoder_kind, spawn_decoder_loop, DecoderCommand, DecoderEvent, DecoderKind,
    NormalDecoder, PassthroughDecoder, TunnelDecoder,
};
use mediacore_render::{AudioRender, VideoRender};
use mediacore_sync::AVSyncController;
use mediacore_types::{
    AudioDevice, ContentSource, PlayerConfig, PlayerError, PlayerListener, PlayerResult, SeekMode,
    TrackType, VideoRenderSink,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::command::{DeferredAction, NotifyBridge, PlayerCommand};
use crate::factory::{CodecFactory, ContentSourceFactory, DemuxerFactory};
use crate::state::{FlushCommand, TrackFlushState};

struct AudioTrackRuntime {
    kind: DecoderKind,
    decoder: mediacore_decode::DecoderHandle,
    render: Arc<AudioRender>,
    flush: TrackFlushState,
}

struct VideoTrackRuntime {
    kind: DecoderKind,
    decoder: mediacore_decode::DecoderHandle,
    render: Option<Arc<VideoRender>>,
    flush: TrackFlushState,
}

/// Builds a player from its external collaborators (§6).
pub struct PlayerBuilder {
    source_factory: Arc<dyn ContentSourceFactory>,
    demuxer_factory: Arc<dyn DemuxerFactory>,
    codec_factory: Arc<dyn CodecFactory>,
    audio_device: Arc<dyn AudioDevice>,
    video_sink: Option<Arc<dyn VideoRenderSink>>,
    listener: Option<Arc<dyn PlayerListener>>,
    config: PlayerConfig,
    tunnel_requested: bool,
    passthrough_requested: bool,
}

impl PlayerBuilder {
    /// Starts a builder with the two required factories and the audio
    /// device; everything else defaults to off/unset.
    pub fn new(
        source_factory: Arc<dyn ContentSourceFactory>,
        codec_factory: Arc<dyn CodecFactory>,
        audio_device: Arc<dyn AudioDevice>,
    ) -> Self {
        Self {
            source_factory,
            demuxer_factory: Arc::new(crate::factory::NoopDemuxerFactory),
            codec_factory,
            audio_device,
            video_sink: None,
            listener: None,
            config: PlayerConfig::default(),
            tunnel_requested: false,
            passthrough_requested: false,
        }
    }

    /// Supplies a demuxer factory (§6). Defaults to a no-op.
    pub fn with_demuxer_factory(mut self, factory: Arc<dyn DemuxerFactory>) -> Self {
        self.demuxer_factory = factory;
        self
    }

    /// Supplies (or replaces) the initial video render sink.
    pub fn with_video_sink(mut self, sink: Arc<dyn VideoRenderSink>) -> Self {
        self.video_sink = Some(sink);
        self
    }

    /// Supplies the listener for error/completion/video-size callbacks.
    pub fn with_listener(mut self, listener: Arc<dyn PlayerListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Overrides the default tunable constants.
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Requests the hardware tunnel path for tunnel-capable video codecs.
    pub fn with_tunnel_mode(mut self, enabled: bool) -> Self {
        self.tunnel_requested = enabled;
        self
    }

    /// Requests audio passthrough for passthrough-capable codecs.
    pub fn with_passthrough(mut self, enabled: bool) -> Self {
        self.passthrough_requested = enabled;
        self
    }

    /// Spawns the player's message loop and returns a handle to it.
    pub fn build(self) -> PlayerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = PlayerActor {
            source_factory: self.source_factory,
            demuxer_factory: self.demuxer_factory,
            codec_factory: self.codec_factory,
            audio_device: self.audio_device,
            video_sink: self.video_sink,
            listener: self.listener,
            config: self.config,
            tunnel_requested: self.tunnel_requested,
            passthrough_requested: self.passthrough_requested,
            self_tx: tx.clone(),
            source: None,
            sync: None,
            audio: None,
            video: None,
            prepared: false,
            pending_start_if_prepare_async: false,
            running: false,
            paused_by_client: false,
            paused_for_buffering: false,
            scan_sources_generation: 0,
            deferred: VecDeque::new(),
            uri: None,
            audio_eos: false,
            video_eos: false,
            last_reported_error: false,
        };
        tokio::spawn(actor.run(rx));
        PlayerHandle { tx }
    }
}

/// A handle to a running player's message loop (§4.11).
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    fn post(&self, cmd: PlayerCommand) {
        let _ = self.tx.send(cmd);
    }

    /// Sets the data source URI; must precede [`Self::prepare`].
    pub fn set_data_source(&self, uri: impl Into<String>) {
        self.post(PlayerCommand::SetDataSource(uri.into()));
    }

    /// Begins preparing (probing) the source.
    pub fn prepare(&self) {
        self.post(PlayerCommand::Prepare);
    }

    /// Starts (or requests starting) playback.
    pub fn start(&self) {
        self.post(PlayerCommand::Start);
    }

    /// Stops playback and releases decoders.
    pub fn stop(&self) {
        self.post(PlayerCommand::Stop);
    }

    /// Pauses playback, waiting for the state machine to acknowledge it.
    pub async fn pause(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.post(PlayerCommand::Pause(ack_tx));
        let _ = ack_rx.await;
    }

    /// Resumes playback.
    pub fn resume(&self) {
        self.post(PlayerCommand::Resume);
    }

    /// Seeks to `pts_us` using `mode`, waiting for the outcome.
    pub async fn seek(&self, pts_us: i64, mode: SeekMode) -> PlayerResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.post(PlayerCommand::Seek(pts_us, mode, ack_tx));
        ack_rx
            .await
            .unwrap_or(Err(PlayerError::NoInit("player loop has shut down".into())))
    }

    /// Tears everything down and returns to the pre-`set_data_source` state.
    pub fn reset(&self) {
        self.post(PlayerCommand::Reset);
    }

    /// Swaps (or sets for the first time) the video render sink.
    pub fn set_video_sink(&self, sink: Arc<dyn VideoRenderSink>) {
        self.post(PlayerCommand::SetVideoSink(sink));
    }
}

struct PlayerActor {
    source_factory: Arc<dyn ContentSourceFactory>,
    demuxer_factory: Arc<dyn DemuxerFactory>,
    codec_factory: Arc<dyn CodecFactory>,
    audio_device: Arc<dyn AudioDevice>,
    video_sink: Option<Arc<dyn VideoRenderSink>>,
    listener: Option<Arc<dyn PlayerListener>>,
    config: PlayerConfig,
    tunnel_requested: bool,
    passthrough_requested: bool,

    self_tx: mpsc::UnboundedSender<PlayerCommand>,

    source: Option<Arc<dyn ContentSource>>,
    sync: Option<Arc<AVSyncController>>,

    audio: Option<AudioTrackRuntime>,
    video: Option<VideoTrackRuntime>,

    prepared: bool,
    pending_start_if_prepare_async: bool,
    running: bool,
    paused_by_client: bool,
    paused_for_buffering: bool,

    scan_sources_generation: u64,
    deferred: VecDeque<DeferredAction>,

    uri: Option<String>,
    audio_eos: bool,
    video_eos: bool,
    last_reported_error: bool,
}

impl PlayerActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlayerCommand>) {
        let span = tracing::span!(tracing::Level::DEBUG, "player");
        let _enter = span.enter();
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
    }

    async fn handle(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::SetDataSource(uri) => self.set_data_source(uri),
            PlayerCommand::Prepare => self.prepare().await,
            PlayerCommand::Start => self.start(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Pause(ack) => {
                self.pause();
                let _ = ack.send(());
            }
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::Seek(pts_us, mode, ack) => {
                let result = self.begin_seek(pts_us, mode);
                let _ = ack.send(result);
            }
            PlayerCommand::Reset => self.begin_reset(),
            PlayerCommand::SetVideoSink(sink) => self.set_video_sink(sink),

            PlayerCommand::SourcePrepared(result) => self.on_source_prepared(result),
            PlayerCommand::FlagsChanged(_flags) => {}
            PlayerCommand::SourceVideoSizeChanged(_format) => {}
            PlayerCommand::BufferingStart => self.set_paused_for_buffering(true),
            PlayerCommand::BufferingUpdate(percent) => {
                debug!(percent, "buffering update");
            }
            PlayerCommand::BufferingEnd => self.set_paused_for_buffering(false),
            PlayerCommand::SourceCompletion => {
                self.audio_eos = self.audio.is_some();
                self.video_eos = self.video.is_some();
                self.maybe_report_completion();
            }
            PlayerCommand::SourceError(err) => self.report_error(err),
            PlayerCommand::FetchData(_track_type) => {}

            PlayerCommand::Decoder(track_type, event) => self.on_decoder_event(track_type, event),
            PlayerCommand::ScanSources(generation) => self.scan_sources(generation),
            PlayerCommand::PollDuration => {
                // TODO: route to `SourceFlags::DYNAMIC_DURATION` sources
                // once one exists in this core; nothing to poll today.
            }
        }
    }

    fn bump_scan_generation(&mut self) {
        self.scan_sources_generation += 1;
    }

    fn post_scan_sources(&self) {
        let _ = self
            .self_tx
            .send(PlayerCommand::ScanSources(self.scan_sources_generation));
    }

    fn set_data_source(&mut self, uri: String) {
        info!(uri = %uri, "set data source");
        self.uri = Some(uri);
    }

    async fn prepare(&mut self) {
        let Some(uri) = self.uri.clone() else {
            self.report_error(PlayerError::InvalidOperation("no data source set".into()));
            return;
        };
        info!("preparing source");
        if let Err(e) = self.demuxer_factory.prepare(&uri) {
            self.report_error(e);
            return;
        }
        let source = match self.source_factory.create(&uri) {
            Ok(source) => source,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };
        source.set_notify(Arc::new(NotifyBridge::new(self.self_tx.clone())));
        self.source = Some(source.clone());
        if let Err(e) = source.prepare().await {
            self.report_error(e);
        }
    }

    fn on_source_prepared(&mut self, result: PlayerResult<()>) {
        match result {
            Ok(()) => {
                info!("source prepared");
                self.prepared = true;
                if self.pending_start_if_prepare_async {
                    self.pending_start_if_prepare_async = false;
                    self.on_start();
                }
            }
            Err(e) => self.report_error(e),
        }
    }

    fn start(&mut self) {
        if !self.prepared {
            info!("start requested before prepare completed; deferring");
            self.pending_start_if_prepare_async = true;
            return;
        }
        self.on_start();
    }

    fn on_start(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        info!("starting playback");
        self.running = true;
        if self.sync.is_none() {
            self.sync = Some(Arc::new(AVSyncController::new()));
        }
        let source_for_spawn = source.clone();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = source_for_spawn.start().await {
                let _ = self_tx.send(PlayerCommand::SourceError(e));
            }
        });
        self.bump_scan_generation();
        self.post_scan_sources();
    }

    fn stop(&mut self) {
        info!("stopping playback");
        self.running = false;
        if let Some(audio) = &self.audio {
            audio.decoder.post(DecoderCommand::Pause(oneshot::channel().0));
            audio.render.stop();
        }
        if let Some(video) = &self.video {
            video.decoder.post(DecoderCommand::Pause(oneshot::channel().0));
            if let Some(render) = &video.render {
                render.stop();
            }
        }
        if let Some(source) = self.source.clone() {
            tokio::spawn(async move {
                let _ = source.stop().await;
            });
        }
    }

    fn pause(&mut self) {
        self.paused_by_client = true;
        self.apply_effective_pause();
    }

    fn resume(&mut self) {
        self.paused_by_client = false;
        self.apply_effective_pause();
    }

    fn set_paused_for_buffering(&mut self, paused: bool) {
        self.paused_for_buffering = paused;
        self.apply_effective_pause();
    }

    /// Pause/resume are independent per §4.11: decoders/renders resume
    /// only once both the client and buffering pause flags are clear.
    fn apply_effective_pause(&mut self) {
        let effective_pause = self.paused_by_client || self.paused_for_buffering;
        if let Some(audio) = &self.audio {
            if effective_pause {
                audio.render.pause();
            } else {
                audio.render.resume();
            }
        }
        if let Some(video) = &self.video {
            if let Some(render) = &video.render {
                if effective_pause {
                    render.pause();
                } else {
                    render.resume();
                }
            }
        }
    }

    fn set_video_sink(&mut self, sink: Arc<dyn VideoRenderSink>) {
        self.video_sink = Some(sink.clone());
        match self.video.as_ref().map(|v| v.kind) {
            Some(DecoderKind::Tunnel) => {
                if let Some(video) = &self.video {
                    video.decoder.post(DecoderCommand::SetVideoRender(sink));
                }
            }
            Some(DecoderKind::Normal) => {
                // The normal path renders through a software `VideoRender`
                // that owns a fixed sink reference; swapping it requires
                // tearing the pipeline down and rescanning.
                self.bump_scan_generation();
                self.deferred.push_back(DeferredAction::Flush {
                    audio: FlushCommand::None,
                    video: FlushCommand::Shutdown,
                });
                self.deferred
                    .push_back(DeferredAction::SetVideoRenderSink(sink));
                self.deferred.push_back(DeferredAction::ScanSources);
                self.deferred
                    .push_back(DeferredAction::ResumeDecoders { notify: true });
                self.dispatch_deferred();
            }
            None => {
                self.bump_scan_generation();
                self.post_scan_sources();
            }
            _ => {}
        }
    }

    fn begin_seek(&mut self, pts_us: i64, mode: SeekMode) -> PlayerResult<()> {
        if self.source.is_none() {
            return Err(PlayerError::InvalidOperation("no source to seek".into()));
        }
        info!(pts_us, ?mode, "seek requested");
        let audio_cmd = if self.audio.is_some() {
            FlushCommand::Flush
        } else {
            FlushCommand::None
        };
        let video_cmd = if self.video.is_some() {
            FlushCommand::Flush
        } else {
            FlushCommand::None
        };
        self.deferred.push_back(DeferredAction::Flush {
            audio: audio_cmd,
            video: video_cmd,
        });
        self.deferred
            .push_back(DeferredAction::SeekSource { pts_us, mode });
        self.deferred
            .push_back(DeferredAction::ResumeDecoders { notify: true });
        self.dispatch_deferred();
        Ok(())
    }

    fn begin_reset(&mut self) {
        info!("reset requested");
        let audio_cmd = if self.audio.is_some() {
            FlushCommand::Shutdown
        } else {
            FlushCommand::None
        };
        let video_cmd = if self.video.is_some() {
            FlushCommand::Shutdown
        } else {
            FlushCommand::None
        };
        self.deferred.push_back(DeferredAction::Flush {
            audio: audio_cmd,
            video: video_cmd,
        });
        self.deferred.push_back(DeferredAction::PerformReset);
        self.dispatch_deferred();
    }

    /// Runs deferred actions while no track is in a transient flush state.
    /// `Flush` resolves synchronously: posting `Flush`/`Shutdown` to a
    /// decoder's own loop and flushing its render happens inline rather
    /// than waiting for an asynchronous acknowledgement, because message
    /// order within a single `mpsc` channel already guarantees the
    /// decoder processes the flush before any command issued after it —
    /// the same ordering guarantee §5 grants the two real cross-loop
    /// channels. See the grounding ledger for the corresponding open
    /// question.
    fn dispatch_deferred(&mut self) {
        while let Some(action) = self.deferred.pop_front() {
            let any_transient = [
                self.audio.as_ref().map(|a| a.flush.status()),
                self.video.as_ref().map(|v| v.flush.status()),
            ]
            .into_iter()
            .flatten()
            .any(|status| status.is_transient());
            if any_transient {
                self.deferred.push_front(action);
                break;
            }
            self.run_deferred_action(action);
        }
    }

    fn run_deferred_action(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::Flush { audio, video } => {
                if audio != FlushCommand::None {
                    if let Some(a) = &mut self.audio {
                        a.flush.begin(audio);
                        a.render.flush();
                        let msg = if audio == FlushCommand::Shutdown {
                            DecoderCommand::Shutdown
                        } else {
                            DecoderCommand::Flush
                        };
                        a.decoder.post(msg);
                        a.flush.ack_render();
                        a.flush.ack_decoder();
                    }
                }
                if video != FlushCommand::None {
                    if let Some(v) = &mut self.video {
                        v.flush.begin(video);
                        if let Some(render) = &v.render {
                            render.flush();
                        }
                        let msg = if video == FlushCommand::Shutdown {
                            DecoderCommand::Shutdown
                        } else {
                            DecoderCommand::Flush
                        };
                        v.decoder.post(msg);
                        v.flush.ack_render();
                        v.flush.ack_decoder();
                    }
                }
                if audio == FlushCommand::Shutdown {
                    self.audio = None;
                }
                if video == FlushCommand::Shutdown {
                    self.video = None;
                }
            }
            DeferredAction::SeekSource { pts_us, mode } => {
                if let Some(source) = self.source.clone() {
                    tokio::spawn(async move {
                        let _ = source.seek_to(pts_us, mode).await;
                    });
                }
            }
            DeferredAction::ResumeDecoders { .. } => {
                if let Some(audio) = &self.audio {
                    audio.decoder.post(DecoderCommand::Resume);
                }
                if let Some(video) = &self.video {
                    video.decoder.post(DecoderCommand::Resume);
                }
                self.audio_eos = false;
                self.video_eos = false;
            }
            DeferredAction::PerformReset => {
                if let Some(audio) = &self.audio {
                    audio.render.stop();
                }
                if let Some(video) = &self.video {
                    if let Some(render) = &video.render {
                        render.stop();
                    }
                }
                self.audio = None;
                self.video = None;
                self.sync = None;
                self.source = None;
                self.prepared = false;
                self.running = false;
                self.pending_start_if_prepare_async = false;
                self.audio_eos = false;
                self.video_eos = false;
            }
            DeferredAction::SetVideoRenderSink(sink) => {
                self.video_sink = Some(sink);
            }
            DeferredAction::ScanSources => {
                self.bump_scan_generation();
                self.post_scan_sources();
            }
        }
    }

    fn scan_sources(&mut self, generation: u64) {
        if generation != self.scan_sources_generation {
            debug!(generation, current = self.scan_sources_generation, "stale scan-sources, ignoring");
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };
        if self.audio.is_none() {
            if let Some(format) = source.get_track_info(TrackType::Audio) {
                match self.instantiate_audio(source.clone(), format) {
                    Ok(()) => {}
                    Err(PlayerError::WouldBlock) => self.retry_scan_later(),
                    Err(e) => self.report_error(e),
                }
            }
        }
        if self.video.is_none() && self.video_sink.is_some() {
            if let Some(format) = source.get_track_info(TrackType::Video) {
                match self.instantiate_video(source.clone(), format) {
                    Ok(()) => {}
                    Err(PlayerError::WouldBlock) => self.retry_scan_later(),
                    Err(e) => self.report_error(e),
                }
            }
        }
        if self.audio.is_none() || (self.video.is_none() && self.video_sink.is_some()) {
            self.retry_scan_later();
        }
    }

    fn retry_scan_later(&self) {
        let delay_ms = self.config.scan_sources_retry_delay_ms;
        let generation = self.scan_sources_generation;
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            let _ = self_tx.send(PlayerCommand::ScanSources(generation));
        });
    }

    fn instantiate_audio(
        &mut self,
        source: Arc<dyn ContentSource>,
        format: mediacore_types::MediaFormat,
    ) -> PlayerResult<()> {
        let kind = select_decoder_kind(&format, false, self.passthrough_requested);
        info!(?kind, mime = %format.mime, "instantiating audio decoder");
        let render = Arc::new(AudioRender::new(
            self.audio_device.clone(),
            self.sync.clone(),
            true,
            self.config,
        ));
        render.start();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.spawn_event_forwarder(TrackType::Audio, events_rx);
        let handle = match kind {
            DecoderKind::Passthrough => {
                let decoder = PassthroughDecoder::new(source, render.clone(), events_tx, self.config);
                spawn_decoder_loop(decoder)
            }
            _ => {
                let codec = self.codec_factory.create(TrackType::Audio, &format)?;
                let decoder =
                    NormalDecoder::new(TrackType::Audio, source, codec, render.clone(), events_tx, self.config);
                spawn_decoder_loop(decoder)
            }
        };
        handle.post(DecoderCommand::Configure(format));
        if self.running && !self.paused_by_client && !self.paused_for_buffering {
            handle.post(DecoderCommand::Start);
        }
        self.audio = Some(AudioTrackRuntime {
            kind,
            decoder: handle,
            render,
            flush: TrackFlushState::default(),
        });
        Ok(())
    }

    fn instantiate_video(
        &mut self,
        source: Arc<dyn ContentSource>,
        format: mediacore_types::MediaFormat,
    ) -> PlayerResult<()> {
        let Some(sink) = self.video_sink.clone() else {
            return Ok(());
        };
        let kind = select_decoder_kind(&format, self.tunnel_requested, false);
        info!(?kind, mime = %format.mime, "instantiating video decoder");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.spawn_event_forwarder(TrackType::Video, events_rx);
        let (handle, render) = match kind {
            DecoderKind::Tunnel => {
                let codec = self.codec_factory.create(TrackType::Video, &format)?;
                let decoder = TunnelDecoder::new(source, codec, sink, events_tx, self.config);
                (spawn_decoder_loop(decoder), None)
            }
            _ => {
                let Some(sync) = self.sync.clone() else {
                    return Err(PlayerError::NoInit("sync controller not ready".into()));
                };
                let listener = self.listener.clone();
                let on_size_changed: Option<Box<dyn Fn(u32, u32) + Send>> = listener
                    .map(|l| Box::new(move |w, h| l.on_video_size_changed(w, h)) as Box<dyn Fn(u32, u32) + Send>);
                let render = Arc::new(VideoRender::new(sink, sync, on_size_changed, self.config));
                render.start();
                let codec = self.codec_factory.create(TrackType::Video, &format)?;
                let decoder = NormalDecoder::new(
                    TrackType::Video,
                    source,
                    codec,
                    render.clone(),
                    events_tx,
                    self.config,
                );
                (spawn_decoder_loop(decoder), Some(render))
            }
        };
        handle.post(DecoderCommand::Configure(format));
        if self.running && !self.paused_by_client && !self.paused_for_buffering {
            handle.post(DecoderCommand::Start);
        }
        self.video = Some(VideoTrackRuntime {
            kind,
            decoder: handle,
            render,
            flush: TrackFlushState::default(),
        });
        Ok(())
    }

    fn spawn_event_forwarder(
        &self,
        track_type: TrackType,
        mut events_rx: mpsc::UnboundedReceiver<DecoderEvent>,
    ) {
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if self_tx.send(PlayerCommand::Decoder(track_type, event)).is_err() {
                    break;
                }
            }
        });
    }

    fn on_decoder_event(&mut self, track_type: TrackType, event: DecoderEvent) {
        match event {
            DecoderEvent::Error(err) => self.report_error(err),
            DecoderEvent::VideoSizeChanged(format) => {
                if let Some(listener) = &self.listener {
                    listener.on_video_size_changed(
                        format.width.unwrap_or(0),
                        format.height.unwrap_or(0),
                    );
                }
            }
            DecoderEvent::AudioOutputFormatChanged(_format) => {}
            DecoderEvent::Eos => {
                match track_type {
                    TrackType::Audio => self.audio_eos = true,
                    TrackType::Video => self.video_eos = true,
                    _ => {}
                }
                self.maybe_report_completion();
            }
        }
    }

    fn maybe_report_completion(&mut self) {
        let audio_done = self.audio.is_none() || self.audio_eos;
        let video_done = self.video.is_none() || self.video_eos;
        if audio_done && video_done && (self.audio.is_some() || self.video.is_some()) {
            info!("playback complete");
            if let Some(listener) = &self.listener {
                listener.on_completion();
            }
        }
    }

    fn report_error(&mut self, err: PlayerError) {
        error!(error = %err, "player error");
        if self.last_reported_error {
            warn!("collapsing repeated error");
            return;
        }
        self.last_reported_error = true;
        if let Some(listener) = &self.listener {
            listener.on_error(err);
        }
    }
}
