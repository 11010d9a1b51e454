//! Audio render (§4.4): owns the audio sink, detects format changes, and
//! anchors the master clock when it is the clock owner.

use std::sync::Arc;

use mediacore_sync::AVSyncController;
use mediacore_types::{
    AudioConfig, AudioDevice, AudioFrameInfo, AudioTrack, FrameSink, MediaFrame, OffloadInfo,
    PlayerConfig, PlayerError, PlayerResult,
};

use crate::scheduler::{RenderDelegate, RenderScheduler, SchedulerMode};

struct AudioRenderDelegate {
    device: Arc<dyn AudioDevice>,
    track: Option<Box<dyn AudioTrack>>,
    current: Option<AudioFrameInfo>,
    is_master: bool,
    sync: Option<Arc<AVSyncController>>,
    desired_rate: f32,
}

impl AudioRenderDelegate {
    fn needs_reopen(&self, info: &AudioFrameInfo) -> bool {
        match &self.current {
            None => true,
            Some(current) => {
                current.sample_rate != info.sample_rate
                    || current.channel_layout != info.channel_layout
                    || current.format != info.format
            }
        }
    }

    fn reopen(&mut self, info: &AudioFrameInfo) -> PlayerResult<()> {
        if let Some(mut track) = self.track.take() {
            let _ = track.close();
        }
        let offload_info = info.format.is_encoded().then_some(OffloadInfo {
            format: info.format,
            sample_rate: info.sample_rate,
            channel_layout: info.channel_layout,
            bit_width: 16,
        });
        let frame_size = info
            .format
            .pcm_bytes_per_sample()
            .map(|bytes| bytes * info.channels as u32)
            .unwrap_or(1);
        let config = AudioConfig {
            sample_rate: info.sample_rate,
            channel_layout: info.channel_layout,
            format: info.format,
            frame_size,
            offload_info,
        };
        let mut track = self.device.create_audio_track()?;
        track.open(config)?;
        if track.supports_playback_rate() {
            let _ = track.set_playback_rate(self.desired_rate);
        }
        track.start()?;
        self.track = Some(track);
        self.current = Some(info.clone());
        Ok(())
    }
}

impl RenderDelegate for AudioRenderDelegate {
    fn render_frame_internal(&mut self, frame: &MediaFrame) -> PlayerResult<i64> {
        let info = frame
            .audio_info()
            .ok_or_else(|| PlayerError::BadValue("audio render given a non-audio frame".into()))?
            .clone();
        if self.needs_reopen(&info) {
            self.reopen(&info)?;
        }
        let track = self
            .track
            .as_mut()
            .ok_or_else(|| PlayerError::InvalidOperation("audio sink not open".into()))?;
        track.write(&frame.payload, false)?;

        if self.is_master {
            if let Some(sync) = &self.sync {
                let now = sync.now_us();
                sync.update_anchor(frame.pts_us, now, frame.pts_us + frame.duration_us.max(0));
            }
        }

        let buffer_duration_us = track.buffer_duration_us() as f64;
        let latency_us = track.latency_us() as f64;
        let frame_duration = frame.duration_us.max(0);
        let next_delay = if latency_us > 0.0 && buffer_duration_us > 0.8 * latency_us {
            2 * frame_duration
        } else if latency_us > 0.0 && buffer_duration_us < 0.2 * latency_us {
            frame_duration / 2
        } else {
            frame_duration
        };
        Ok(next_delay)
    }
}

/// The audio-specialized render scheduler.
pub struct AudioRender {
    scheduler: RenderScheduler<AudioRenderDelegate>,
}

impl AudioRender {
    /// Creates an audio render backed by `device`. `is_master` decides
    /// whether it anchors the shared clock; pass `None` for `sync` if this
    /// render never acts as master.
    pub fn new(
        device: Arc<dyn AudioDevice>,
        sync: Option<Arc<AVSyncController>>,
        is_master: bool,
        config: PlayerConfig,
    ) -> Self {
        let delegate = AudioRenderDelegate {
            device,
            track: None,
            current: None,
            is_master,
            sync,
            desired_rate: 1.0,
        };
        Self {
            scheduler: RenderScheduler::new(SchedulerMode::Audio, delegate, config),
        }
    }

    /// Starts the scheduler. The sink itself opens lazily on the first
    /// frame (or via [`Self::open_audio_sink`]).
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stops the scheduler.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Freezes delivery.
    pub fn pause(&self) {
        self.scheduler.pause();
    }

    /// Unfreezes delivery.
    pub fn resume(&self) {
        self.scheduler.resume();
    }

    /// Drains the queue, releasing every pending frame with `rendered = false`.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    /// Enqueues a decoded audio frame with its release callback.
    pub fn render_frame(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.scheduler.render_frame(frame, release);
    }

    /// Primes the sink ahead of the first frame, e.g. during `Prepare`.
    pub fn open_audio_sink(&self, info: AudioFrameInfo) -> PlayerResult<()> {
        self.scheduler.with_delegate(|d| d.reopen(&info))
    }

    /// Tears down the sink, e.g. during `Reset`.
    pub fn close_audio_sink(&self) {
        self.scheduler.with_delegate(|d| {
            if let Some(mut track) = d.track.take() {
                let _ = track.close();
            }
            d.current = None;
        });
    }

    /// Requests a playback rate. Applied immediately if the sink supports
    /// hardware rate control; otherwise remembered for the next
    /// [`Self::open_audio_sink`]/reopen and left to the caller to handle in
    /// software (deferred, see design notes).
    pub fn set_playback_rate(&self, rate: f32) {
        self.scheduler.with_delegate(|d| {
            d.desired_rate = rate;
            if let Some(track) = d.track.as_mut() {
                if track.supports_playback_rate() {
                    let _ = track.set_playback_rate(rate);
                }
            }
        });
    }

    /// Number of frames currently queued.
    pub fn queue_len(&self) -> usize {
        self.scheduler.queue_len()
    }
}

impl FrameSink for AudioRender {
    fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.render_frame(frame, release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacore_types::AudioSampleFormat;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeTrack {
        written: Vec<u8>,
        frames_written: u64,
        buffer_duration_us: i64,
        latency_us: i64,
        rate: f32,
    }

    impl AudioTrack for FakeTrack {
        fn open(&mut self, _config: AudioConfig) -> PlayerResult<()> {
            Ok(())
        }
        fn start(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn stop(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn pause(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn flush(&mut self) -> PlayerResult<()> {
            self.written.clear();
            Ok(())
        }
        fn close(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn write(&mut self, data: &[u8], _blocking: bool) -> PlayerResult<usize> {
            self.written.extend_from_slice(data);
            self.frames_written += 1;
            Ok(data.len())
        }
        fn frames_written(&self) -> u64 {
            self.frames_written
        }
        fn buffer_duration_us(&self) -> i64 {
            self.buffer_duration_us
        }
        fn latency_us(&self) -> i64 {
            self.latency_us
        }
        fn msecs_per_frame(&self) -> f64 {
            20.0
        }
        fn set_playback_rate(&mut self, rate: f32) -> PlayerResult<()> {
            self.rate = rate;
            Ok(())
        }
        fn supports_playback_rate(&self) -> bool {
            true
        }
        fn ready(&self) -> bool {
            true
        }
    }

    struct FakeDevice {
        tracks_created: AtomicU64,
        buffer_duration_us: i64,
        latency_us: i64,
    }

    impl AudioDevice for FakeDevice {
        fn init(&self) -> PlayerResult<()> {
            Ok(())
        }
        fn create_audio_track(&self) -> PlayerResult<Box<dyn AudioTrack>> {
            self.tracks_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeTrack {
                written: Vec::new(),
                frames_written: 0,
                buffer_duration_us: self.buffer_duration_us,
                latency_us: self.latency_us,
                rate: 1.0,
            }))
        }
    }

    fn audio_frame(pts_us: i64, format: AudioSampleFormat) -> MediaFrame {
        MediaFrame::audio(
            pts_us,
            20_000,
            AudioFrameInfo {
                sample_rate: 44_100,
                channels: 2,
                channel_layout: 2,
                format,
            },
            vec![0u8; 8],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_frame_opens_the_sink_once() {
        let device = Arc::new(FakeDevice {
            tracks_created: AtomicU64::new(0),
            buffer_duration_us: 100_000,
            latency_us: 200_000,
        });
        let render = AudioRender::new(device.clone(), None, false, PlayerConfig::default());
        render.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        render.render_frame(
            audio_frame(0, AudioSampleFormat::Pcm16),
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert!(rx.await.unwrap());
        assert_eq!(device.tracks_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn format_change_reopens_the_sink() {
        let device = Arc::new(FakeDevice {
            tracks_created: AtomicU64::new(0),
            buffer_duration_us: 100_000,
            latency_us: 200_000,
        });
        let render = AudioRender::new(device.clone(), None, false, PlayerConfig::default());
        render.start();

        let (tx1, rx1) = tokio::sync::oneshot::channel();
        render.render_frame(
            audio_frame(0, AudioSampleFormat::Pcm16),
            Box::new(move |r| {
                let _ = tx1.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        rx1.await.unwrap();

        let (tx2, rx2) = tokio::sync::oneshot::channel();
        render.render_frame(
            audio_frame(20_000, AudioSampleFormat::Ac3),
            Box::new(move |r| {
                let _ = tx2.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        rx2.await.unwrap();

        assert_eq!(device.tracks_created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn master_render_anchors_the_clock() {
        let device = Arc::new(FakeDevice {
            tracks_created: AtomicU64::new(0),
            buffer_duration_us: 100_000,
            latency_us: 200_000,
        });
        let sync = Arc::new(AVSyncController::new());
        let render = AudioRender::new(device, Some(sync.clone()), true, PlayerConfig::default());
        render.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        render.render_frame(
            audio_frame(500_000, AudioSampleFormat::Pcm16),
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        rx.await.unwrap();
        assert!(sync.get_master_clock() >= 500_000);
    }
}
