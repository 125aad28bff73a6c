use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use livecast_rtmp::{
    flv::{
        aac_packetizer::AacPacketizer, avc_packetizer::AvcPacketizer, define::FlvTag,
        errors::FlvPackError,
    },
    h264::sps::Sps,
    rtmp::{
        netstream::writer::StreamMetadata,
        session::errors::{SessionError, SessionErrorValue},
    },
    throughput::{TcpThroughputAdaptation, ThroughputEstimate, ThroughputHandle},
    ClientState, MediaSender, PublisherConfig, RtmpPublisher, RtmpUrl,
};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::{sync::mpsc, task::JoinHandle};

use super::{
    define::{session_state_for, CameraState, SessionOptions, SessionState},
    delegate::{AudioEncoder, SessionDelegate, VideoEncoder},
};
use crate::{
    audio_mixer::{AudioMixer, SourceId},
    bitrate::{audio_bitrate_for, next_video_bitrate},
    config::{Config, RtmpConfig},
    error::{Error, Result},
    filters::{FilterFactory, VideoFilter},
    pixel_buffer::PixelBuffer,
    transforms::{AspectMode, AspectTransform, BufferMetadata, Output, Overlay, Rect, Split},
};

const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44100;
const DEFAULT_AUDIO_CHANNELS: u8 = 2;

struct Settings {
    video_width: u32,
    video_height: u32,
    fps: u32,
    /// Configured bitrate, the adaptive ceiling.
    bitrate: u32,
    use_interface_orientation: bool,
    camera_state: CameraState,
    audio_channel_count: u8,
    audio_sample_rate: u32,
    use_adaptive_bitrate: bool,
    filter: VideoFilter,
    rtmp: RtmpConfig,
    sample_period: Duration,
}

impl Settings {
    fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            connect_timeout: Duration::from_secs(self.rtmp.connect_timeout_seconds),
            handshake_timeout: Duration::from_secs(self.rtmp.handshake_timeout_seconds),
            out_chunk_size: self.rtmp.out_chunk_size,
            media_queue_capacity: self.rtmp.media_queue_capacity,
            metadata: StreamMetadata {
                width: self.video_width,
                height: self.video_height,
                video_bitrate: self.bitrate,
                frame_rate: f64::from(self.fps),
                audio_sample_rate: self.audio_sample_rate,
                stereo: self.audio_channel_count == 2,
            },
        }
    }
}

struct StateCell {
    state: SessionState,
    /// Bumped on every start and end so events from an old publisher are ignored.
    generation: u64,
}

enum Guard {
    Always,
    Generation(u64),
    From(SessionState),
}

struct FramePipeline {
    factory: FilterFactory,
    aspect: AspectTransform,
    overlays: Vec<Overlay>,
}

struct Publishing {
    publisher: RtmpPublisher,
    media: MediaSender,
    avc: AvcPacketizer,
    aac: AacPacketizer,
    throughput: ThroughputHandle,
    state_task: JoinHandle<()>,
}

struct Shared {
    settings: Mutex<Settings>,
    state: Mutex<StateCell>,
    /// Held while a state change is applied and reported, keeping delegate
    /// calls in order. Reentrant so a delegate may query the session.
    notify: ReentrantMutex<()>,
    delegate: Mutex<Option<Weak<dyn SessionDelegate>>>,
    estimated_throughput: AtomicU64,
    frames: Mutex<FramePipeline>,
    outputs: Split,
    video_encoder: Mutex<Option<Box<dyn VideoEncoder>>>,
    audio_encoder: Mutex<Option<Box<dyn AudioEncoder>>>,
    mixer: Mutex<AudioMixer>,
    /// Fed by `push_pcm`; its gain is the mic gain.
    mic_source: SourceId,
    publishing: Mutex<Option<Publishing>>,
}

impl Shared {
    fn delegate(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.delegate.lock().as_ref().and_then(Weak::upgrade)
    }

    fn transition(&self, state: SessionState, guard: Guard) -> bool {
        let _ordered = self.notify.lock();
        {
            let mut cell = self.state.lock();
            let allowed = match guard {
                Guard::Always => true,
                Guard::Generation(generation) => generation == cell.generation,
                Guard::From(expected) => expected == cell.state,
            };
            if !allowed || cell.state == state {
                return false;
            }
            tracing::info!("session state {:?} -> {:?}", cell.state, state);
            cell.state = state;
        }
        if let Some(delegate) = self.delegate() {
            delegate.connection_status_changed(state);
        }
        true
    }

    fn bump_generation(&self) {
        self.state.lock().generation += 1;
    }

    fn on_throughput(&self, estimate: ThroughputEstimate) {
        let predicted = estimate.predicted_bytes_per_sec.max(0.0) as u64;
        self.estimated_throughput.store(predicted, Ordering::Relaxed);

        let (adaptive, ceiling) = {
            let settings = self.settings.lock();
            (settings.use_adaptive_bitrate, settings.bitrate)
        };
        if !adaptive {
            return;
        }

        if estimate.vector != 0.0 {
            let mut video_encoder = self.video_encoder.lock();
            if let Some(encoder) = video_encoder.as_mut() {
                let current = encoder.bitrate();
                let next = next_video_bitrate(current, estimate.vector, ceiling);

                if let Some(audio) = self.audio_encoder.lock().as_mut() {
                    audio.set_bitrate(audio_bitrate_for(current));
                }
                if next != current {
                    tracing::info!("video bitrate {current} -> {next} bps");
                    encoder.set_bitrate(next);
                }
            }
        }

        if let Some(delegate) = self.delegate() {
            delegate.detected_throughput(predicted);
        }
    }
}

async fn forward_client_states(
    shared: Weak<Shared>,
    mut client_states: mpsc::UnboundedReceiver<ClientState>,
    generation: u64,
) {
    while let Some(client_state) = client_states.recv().await {
        tracing::debug!("rtmp client state {client_state:?}");
        let Some(state) = session_state_for(client_state) else {
            continue;
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.transition(state, Guard::Generation(generation));
    }
}

/// Queue a tag. A publisher that already finished on its own swallows it.
async fn forward(media: &MediaSender, tag: FlvTag) -> Result<()> {
    match media.push(tag).await {
        Ok(_) => Ok(()),
        Err(SessionError {
            value: SessionErrorValue::PublisherGone,
        }) => {
            tracing::trace!("publisher gone, media discarded");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// RTMP timestamps are 32 bit milliseconds and wrap.
const fn millis(time: Duration) -> u32 {
    (time.as_millis() & 0xFFFF_FFFF) as u32
}

/// A live broadcast: frame processing, encoding and one RTMP session at a time.
///
/// Start, push and end may be called from any task of a tokio runtime.
pub struct BroadcastSession {
    inner: Arc<Shared>,
}

impl BroadcastSession {
    #[must_use]
    pub fn new(video_width: u32, video_height: u32, fps: u32, bitrate: u32) -> Self {
        Self::with_options(video_width, video_height, fps, bitrate, SessionOptions::default())
    }

    #[must_use]
    pub fn with_options(
        video_width: u32,
        video_height: u32,
        fps: u32,
        bitrate: u32,
        options: SessionOptions,
    ) -> Self {
        let settings = Settings {
            video_width,
            video_height,
            fps,
            bitrate,
            use_interface_orientation: options.use_interface_orientation,
            camera_state: options.camera_state,
            audio_channel_count: DEFAULT_AUDIO_CHANNELS,
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            use_adaptive_bitrate: false,
            filter: VideoFilter::Normal,
            rtmp: RtmpConfig::default(),
            sample_period: livecast_rtmp::throughput::tcp_adaptation::DEFAULT_SAMPLE_PERIOD,
        };
        let mut mixer = AudioMixer::new(DEFAULT_AUDIO_SAMPLE_RATE, DEFAULT_AUDIO_CHANNELS);
        let mic_source = mixer.register_source();

        Self {
            inner: Arc::new(Shared {
                settings: Mutex::new(settings),
                state: Mutex::new(StateCell {
                    state: SessionState::None,
                    generation: 0,
                }),
                notify: ReentrantMutex::new(()),
                delegate: Mutex::new(None),
                estimated_throughput: AtomicU64::new(0),
                frames: Mutex::new(FramePipeline {
                    factory: FilterFactory::new(),
                    aspect: AspectTransform::new(video_width, video_height, options.aspect_mode),
                    overlays: Vec::new(),
                }),
                outputs: Split::new(),
                video_encoder: Mutex::new(None),
                audio_encoder: Mutex::new(None),
                mixer: Mutex::new(mixer),
                mic_source,
                publishing: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let session = Self::new(
            config.video.width,
            config.video.height,
            config.video.fps,
            config.video.bitrate,
        );
        {
            let mut settings = session.inner.settings.lock();
            settings.audio_channel_count = config.audio.channels;
            settings.audio_sample_rate = config.audio.sample_rate;
            settings.use_adaptive_bitrate = config.adaptive.enabled;
            settings.filter = config.video.filter;
            settings.rtmp = config.rtmp.clone();
            settings.sample_period = config.sample_period();
        }
        {
            let mut mixer = session.inner.mixer.lock();
            mixer.set_channel_count(config.audio.channels);
            mixer.set_frequency_in_hz(config.audio.sample_rate);
            mixer.set_source_gain(session.inner.mic_source, config.audio.mic_gain);
        }
        session
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.lock().state
    }

    pub fn set_delegate<D: SessionDelegate + 'static>(&self, delegate: &Arc<D>) {
        let delegate: Arc<dyn SessionDelegate> = Arc::clone(delegate) as Arc<dyn SessionDelegate>;
        *self.inner.delegate.lock() = Some(Arc::downgrade(&delegate));
    }

    pub fn clear_delegate(&self) {
        *self.inner.delegate.lock() = None;
    }

    #[must_use]
    pub fn video_size(&self) -> (u32, u32) {
        let settings = self.inner.settings.lock();
        (settings.video_width, settings.video_height)
    }

    /// Applies to frames pushed from now on and to the next session's metadata.
    pub fn set_video_size(&self, width: u32, height: u32) {
        {
            let mut settings = self.inner.settings.lock();
            settings.video_width = width;
            settings.video_height = height;
        }
        self.inner.frames.lock().aspect.set_bounding_size(width, height);
    }

    #[must_use]
    pub fn bitrate(&self) -> u32 {
        self.inner.settings.lock().bitrate
    }

    pub fn set_bitrate(&self, bitrate: u32) {
        self.inner.settings.lock().bitrate = bitrate;
    }

    #[must_use]
    pub fn fps(&self) -> u32 {
        self.inner.settings.lock().fps
    }

    pub fn set_fps(&self, fps: u32) {
        self.inner.settings.lock().fps = fps;
    }

    #[must_use]
    pub fn use_interface_orientation(&self) -> bool {
        self.inner.settings.lock().use_interface_orientation
    }

    #[must_use]
    pub fn camera_state(&self) -> CameraState {
        self.inner.settings.lock().camera_state
    }

    pub fn set_camera_state(&self, camera_state: CameraState) {
        self.inner.settings.lock().camera_state = camera_state;
    }

    #[must_use]
    pub fn audio_channel_count(&self) -> u8 {
        self.inner.settings.lock().audio_channel_count
    }

    /// The mixer switches immediately; stream metadata follows on the next session.
    pub fn set_audio_channel_count(&self, channels: u8) {
        let channels = channels.clamp(1, 2);
        self.inner.settings.lock().audio_channel_count = channels;
        self.inner.mixer.lock().set_channel_count(channels);
    }

    #[must_use]
    pub fn audio_sample_rate(&self) -> u32 {
        self.inner.settings.lock().audio_sample_rate
    }

    /// The mixer switches immediately; stream metadata follows on the next session.
    pub fn set_audio_sample_rate(&self, sample_rate: u32) {
        let sample_rate = sample_rate.max(1);
        self.inner.settings.lock().audio_sample_rate = sample_rate;
        self.inner.mixer.lock().set_frequency_in_hz(sample_rate);
    }

    #[must_use]
    pub fn mic_gain(&self) -> f32 {
        self.inner
            .mixer
            .lock()
            .source_gain(self.inner.mic_source)
            .unwrap_or_default()
    }

    pub fn set_mic_gain(&self, gain: f32) {
        self.inner
            .mixer
            .lock()
            .set_source_gain(self.inner.mic_source, gain);
    }

    /// An extra PCM source mixed with the mic, at full gain.
    pub fn register_audio_source(&self) -> SourceId {
        self.inner.mixer.lock().register_source()
    }

    /// The mic source cannot be removed.
    pub fn unregister_audio_source(&self, source: SourceId) -> bool {
        source != self.inner.mic_source && self.inner.mixer.lock().unregister_source(source)
    }

    pub fn set_audio_source_gain(&self, source: SourceId, gain: f32) {
        self.inner.mixer.lock().set_source_gain(source, gain);
    }

    #[must_use]
    pub fn use_adaptive_bitrate(&self) -> bool {
        self.inner.settings.lock().use_adaptive_bitrate
    }

    pub fn set_use_adaptive_bitrate(&self, enabled: bool) {
        self.inner.settings.lock().use_adaptive_bitrate = enabled;
    }

    /// Last predicted throughput in bytes per second.
    #[must_use]
    pub fn estimated_throughput(&self) -> u64 {
        self.inner.estimated_throughput.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn aspect_mode(&self) -> AspectMode {
        self.inner.frames.lock().aspect.aspect_mode()
    }

    pub fn set_aspect_mode(&self, mode: AspectMode) {
        self.inner.frames.lock().aspect.set_aspect_mode(mode);
    }

    #[must_use]
    pub fn filter(&self) -> VideoFilter {
        self.inner.settings.lock().filter
    }

    pub fn set_filter(&self, filter: VideoFilter) {
        tracing::debug!("video filter {filter}");
        self.inner.settings.lock().filter = filter;
    }

    /// Advance to the next filter and return it.
    pub fn cycle_filter(&self) -> VideoFilter {
        let mut settings = self.inner.settings.lock();
        settings.filter = settings.filter.next();
        settings.filter
    }

    pub fn set_video_encoder(&self, encoder: Box<dyn VideoEncoder>) {
        *self.inner.video_encoder.lock() = Some(encoder);
    }

    pub fn set_audio_encoder(&self, encoder: Box<dyn AudioEncoder>) {
        *self.inner.audio_encoder.lock() = Some(encoder);
    }

    /// Current encoder bitrate, if a video encoder is set.
    #[must_use]
    pub fn video_encoder_bitrate(&self) -> Option<u32> {
        self.inner.video_encoder.lock().as_ref().map(|encoder| encoder.bitrate())
    }

    /// `output` receives every processed frame. Held weakly.
    pub fn add_frame_output(&self, output: &Arc<dyn Output>) {
        self.inner.outputs.set_output(output);
    }

    pub fn remove_frame_output(&self, output: &Arc<dyn Output>) {
        self.inner.outputs.remove_output(output);
    }

    /// Composite `image` over every frame, centred on the origin of `rect`.
    pub fn add_pixel_buffer_source(&self, image: &PixelBuffer, rect: Rect) {
        let (width, height) = self.video_size();
        self.inner
            .frames
            .lock()
            .overlays
            .push(Overlay::new(image, rect, width, height));
    }

    /// Connect and publish to `url`. `stream_key`, when non-empty, is the
    /// stream name and the whole url path is the application.
    ///
    /// Returns once the publisher is spawned; progress is reported to the
    /// delegate. Must be called within a tokio runtime.
    pub fn start_rtmp_session(&self, url: &str, stream_key: &str) -> Result<()> {
        let url = if stream_key.trim().is_empty() {
            RtmpUrl::parse(url)?
        } else {
            RtmpUrl::with_stream_key(url, stream_key)?
        };

        let _ordered = self.inner.notify.lock();
        let generation = {
            let mut cell = self.inner.state.lock();
            if !cell.state.can_start() {
                return Err(Error::InvalidState {
                    operation: "start an rtmp session",
                    state: cell.state,
                });
            }
            cell.generation += 1;
            cell.generation
        };

        // A finished session may still be parked here; dropping it stops its tasks.
        drop(self.inner.publishing.lock().take());

        let (config, sample_period, sample_rate, channels) = {
            let settings = self.inner.settings.lock();
            (
                settings.publisher_config(),
                settings.sample_period,
                settings.audio_sample_rate,
                settings.audio_channel_count,
            )
        };

        tracing::info!(
            "starting rtmp session to {}:{} app '{}' stream '{}'",
            url.host,
            url.port,
            url.app,
            url.play_path
        );
        self.inner.transition(SessionState::Starting, Guard::Generation(generation));

        let adaptation = TcpThroughputAdaptation::new();
        let (publisher, client_states) =
            RtmpPublisher::start(url, config, Some(Arc::clone(&adaptation)));

        let weak = Arc::downgrade(&self.inner);
        let throughput = adaptation.start(
            sample_period,
            Box::new(move |estimate| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_throughput(estimate);
                }
            }),
        );
        let state_task = tokio::spawn(forward_client_states(
            Arc::downgrade(&self.inner),
            client_states,
            generation,
        ));

        *self.inner.publishing.lock() = Some(Publishing {
            media: publisher.media_sender(),
            publisher,
            avc: AvcPacketizer::new(),
            aac: AacPacketizer::new(sample_rate, channels, 0),
            throughput,
            state_task,
        });
        Ok(())
    }

    /// Flush queued media, tear the connection down and report `Ended`.
    pub async fn end_rtmp_session(&self) {
        let publishing = self.inner.publishing.lock().take();
        self.inner.bump_generation();

        if let Some(Publishing {
            publisher,
            throughput,
            state_task,
            ..
        }) = publishing
        {
            throughput.stop().await;
            if let Err(err) = publisher.end().await {
                tracing::warn!("rtmp session ended with error: {err}");
            }
            if let Err(err) = state_task.await {
                tracing::warn!("state forwarding ended abnormally: {err}");
            }
        }

        self.inner.transition(SessionState::Ended, Guard::Always);
    }

    /// Publish one encoded NAL unit. Discarded when no session is running.
    pub async fn push_video_nal(&self, nal: &[u8], pts: Duration, dts: Duration) -> Result<()> {
        let (tag, sps, media) = {
            let mut publishing = self.inner.publishing.lock();
            let Some(publishing) = publishing.as_mut() else {
                return Ok(());
            };
            let tag = publishing.avc.packetize(nal, millis(pts), millis(dts))?;
            let sps = tag
                .as_ref()
                .filter(|tag| tag.is_sequence_header)
                .and_then(|_| publishing.avc.sps_info());
            (tag, sps, publishing.media.clone())
        };
        if let Some(sps) = sps {
            self.check_sps(sps);
        }
        match tag {
            Some(tag) => forward(&media, tag).await,
            None => Ok(()),
        }
    }

    /// The encoder's picture size should match the advertised one.
    fn check_sps(&self, sps: std::result::Result<Sps, FlvPackError>) {
        let (width, height) = self.video_size();
        match sps {
            Ok(sps) if (sps.width, sps.height) == (width, height) => {
                tracing::debug!("sps picture size {}x{}", sps.width, sps.height);
            }
            Ok(sps) => tracing::warn!(
                "encoder sps is {}x{} but the session is configured for {}x{}",
                sps.width,
                sps.height,
                width,
                height
            ),
            Err(err) => tracing::warn!("cannot parse encoder sps: {err}"),
        }
    }

    /// Publish one raw AAC frame. Discarded when no session is running.
    pub async fn push_audio_frame(&self, frame: &[u8], timestamp: Duration) -> Result<()> {
        let (tags, media) = {
            let mut publishing = self.inner.publishing.lock();
            let Some(publishing) = publishing.as_mut() else {
                return Ok(());
            };
            (
                publishing.aac.packetize(frame, millis(timestamp))?,
                publishing.media.clone(),
            )
        };
        for tag in tags {
            forward(&media, tag).await?;
        }
        Ok(())
    }

    /// Run a captured frame through aspect, filter and overlays, hand it to
    /// the frame outputs, then encode and publish it.
    pub async fn push_pixel_buffer(&self, frame: &PixelBuffer, pts: Duration) -> Result<()> {
        self.inner
            .transition(SessionState::PreviewStarted, Guard::From(SessionState::None));

        let filter = self.filter();
        let processed = {
            let mut frames = self.inner.frames.lock();
            let frames = &mut *frames;
            let mut processed = frames.aspect.apply(frame);
            if filter != VideoFilter::Normal {
                if let Some(kernel) = frames.factory.filter(filter.filter_name()) {
                    processed = kernel.apply(&processed);
                }
            }
            for overlay in &mut frames.overlays {
                overlay.composite(&mut processed);
            }
            processed
        };

        self.inner.outputs.push_buffer(
            processed.data(),
            &BufferMetadata::Video {
                pts,
                width: processed.width(),
                height: processed.height(),
            },
        );

        let encoded = match self.inner.video_encoder.lock().as_mut() {
            Some(encoder) => encoder.encode(&processed, pts)?,
            None => return Ok(()),
        };
        for unit in encoded {
            self.push_video_nal(&unit.data, unit.pts, unit.dts).await?;
        }
        Ok(())
    }

    /// Mix interleaved mic samples, at the session's audio format, then
    /// encode and publish them.
    pub async fn push_pcm(&self, samples: &[i16], timestamp: Duration) -> Result<()> {
        let (sample_rate, channels) = {
            let settings = self.inner.settings.lock();
            (settings.audio_sample_rate, settings.audio_channel_count)
        };
        self.push_source_pcm(self.inner.mic_source, samples, sample_rate, channels, timestamp)
            .await
    }

    /// Buffer samples of one source and publish everything that source has
    /// buffered, mixed with whatever the other sources hold for the same span.
    pub async fn push_source_pcm(
        &self,
        source: SourceId,
        samples: &[i16],
        sample_rate: u32,
        channels: u8,
        timestamp: Duration,
    ) -> Result<()> {
        let (mixed, out_rate, out_channels) = {
            let mut mixer = self.inner.mixer.lock();
            let frames = mixer.push(source, samples, sample_rate, channels)?;
            (mixer.mix(frames), mixer.frequency_in_hz(), mixer.channel_count())
        };
        if mixed.is_empty() {
            return Ok(());
        }

        self.inner.outputs.push_buffer(
            &sample_bytes(&mixed),
            &BufferMetadata::Audio {
                timestamp,
                sample_rate: out_rate,
                channels: out_channels,
            },
        );

        let frames = match self.inner.audio_encoder.lock().as_mut() {
            Some(encoder) => encoder.encode(&mixed, timestamp)?,
            None => return Ok(()),
        };
        for frame in frames {
            self.push_audio_frame(&frame.data, frame.timestamp).await?;
        }
        Ok(())
    }
}

/// Little-endian bytes of interleaved samples.
fn sample_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}
