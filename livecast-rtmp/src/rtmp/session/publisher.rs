use {
    super::{
        define::{
            transaction, ClientState, PublisherConfig, NETSTREAM_PUBLISH_BADNAME,
            NETSTREAM_PUBLISH_START,
        },
        errors::{SessionError, SessionErrorValue},
    },
    crate::{
        bytesio::{
            bytesio::{TNetIO, TcpIO},
            bytesio_errors::BytesIOError,
        },
        flv::{amf0::Amf0ValueType, define::FlvTag},
        rtmp::{
            chunk::{
                define::csid_type, packetizer::ChunkPacketizer, unpacketizer::ChunkUnpacketizer,
                ChunkInfo,
            },
            handshake::{define::HandshakeEvent, handshake_client::SimpleHandshakeClient},
            messages::{
                define::{RtmpMessageData, UserControlEvent},
                parser::MessageParser,
            },
            netconnection::writer::NetConnection,
            netstream::writer::NetStreamWriter,
            protocol_control_messages::writer as control_writer,
            user_control_messages::writer as event_writer,
            utils::RtmpUrl,
        },
        throughput::TcpThroughputAdaptation,
    },
    bytes::BytesMut,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            Arc,
        },
    },
    tokio::{
        sync::{
            mpsc::{self, error::TrySendError},
            oneshot,
        },
        task::JoinHandle,
        time::timeout,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was full and the tag could be sacrificed.
    Dropped,
}

/// Counters shared between the publisher handle and its task.
#[derive(Debug, Default)]
pub struct PublisherStats {
    queued_bytes: AtomicUsize,
    sent_bytes: AtomicU64,
    dropped_frames: AtomicU64,
}

impl PublisherStats {
    #[must_use]
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

/// Cloneable producer side of the media queue.
#[derive(Clone)]
pub struct MediaSender {
    sender: mpsc::Sender<FlvTag>,
    stats: Arc<PublisherStats>,
}

impl MediaSender {
    /// Queue a tag for sending. Inter frames are dropped when the queue is
    /// full; everything else waits for room.
    pub async fn push(&self, tag: FlvTag) -> Result<PushOutcome, SessionError> {
        let len = tag.data.len();
        self.stats.queued_bytes.fetch_add(len, Ordering::Relaxed);

        let result = if tag.is_droppable() {
            match self.sender.try_send(tag) {
                Ok(()) => Ok(PushOutcome::Queued),
                Err(TrySendError::Full(tag)) => {
                    let dropped = self.stats.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(
                        "media queue full, dropped inter frame at {} ms ({dropped} so far)",
                        tag.timestamp
                    );
                    Ok(PushOutcome::Dropped)
                }
                Err(TrySendError::Closed(_)) => Err(SessionErrorValue::PublisherGone.into()),
            }
        } else {
            self.sender
                .send(tag)
                .await
                .map(|()| PushOutcome::Queued)
                .map_err(|_| SessionErrorValue::PublisherGone.into())
        };

        if !matches!(result, Ok(PushOutcome::Queued)) {
            self.stats.queued_bytes.fetch_sub(len, Ordering::Relaxed);
        }
        result
    }
}

/// Handle to a running RTMP publish session.
pub struct RtmpPublisher {
    media: MediaSender,
    stop_sender: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<Result<(), SessionError>>>,
}

impl RtmpPublisher {
    /// Spawn the publisher. Every client state change is reported, in order,
    /// on the returned receiver.
    pub fn start(
        url: RtmpUrl,
        config: PublisherConfig,
        throughput: Option<Arc<TcpThroughputAdaptation>>,
    ) -> (Self, mpsc::UnboundedReceiver<ClientState>) {
        let (media_sender, media_receiver) = mpsc::channel(config.media_queue_capacity.max(1));
        let (stop_sender, stop_receiver) = oneshot::channel();
        let (state_sender, state_receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(PublisherStats::default());

        let join = tokio::spawn(publish_task(
            url,
            config,
            throughput,
            Arc::clone(&stats),
            media_receiver,
            stop_receiver,
            state_sender,
        ));

        (
            Self {
                media: MediaSender {
                    sender: media_sender,
                    stats,
                },
                stop_sender: Some(stop_sender),
                join: Some(join),
            },
            state_receiver,
        )
    }

    #[must_use]
    pub const fn stats(&self) -> &Arc<PublisherStats> {
        &self.media.stats
    }

    #[must_use]
    pub fn media_sender(&self) -> MediaSender {
        self.media.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn push(&self, tag: FlvTag) -> Result<PushOutcome, SessionError> {
        self.media.push(tag).await
    }

    /// Stop publishing: deleteStream is sent when a stream was created, then
    /// the connection is closed. Returns the task's outcome.
    pub async fn end(mut self) -> Result<(), SessionError> {
        if let Some(stop_sender) = self.stop_sender.take() {
            let _ = stop_sender.send(());
        }
        match self.join.take() {
            Some(join) => join
                .await
                .map_err(|_| SessionError::from(SessionErrorValue::TaskPanicked))?,
            None => Ok(()),
        }
    }
}

impl Drop for RtmpPublisher {
    fn drop(&mut self) {
        if let Some(stop_sender) = self.stop_sender.take() {
            let _ = stop_sender.send(());
        }
    }
}

/// Publishes state changes, moving forward only and never past a terminal state.
struct StateReporter {
    current: ClientState,
    sender: mpsc::UnboundedSender<ClientState>,
}

impl StateReporter {
    fn set(&mut self, state: ClientState) {
        if self.current.is_terminal() || state <= self.current {
            return;
        }
        tracing::debug!("rtmp client state {} -> {}", self.current, state);
        self.current = state;
        let _ = self.sender.send(state);
    }

    const fn current(&self) -> ClientState {
        self.current
    }
}

enum LoopEvent {
    Stop,
    Data(Result<BytesMut, BytesIOError>),
    Media(Option<FlvTag>),
}

async fn publish_task(
    url: RtmpUrl,
    config: PublisherConfig,
    throughput: Option<Arc<TcpThroughputAdaptation>>,
    stats: Arc<PublisherStats>,
    media_receiver: mpsc::Receiver<FlvTag>,
    mut stop_receiver: oneshot::Receiver<()>,
    state_sender: mpsc::UnboundedSender<ClientState>,
) -> Result<(), SessionError> {
    let mut states = StateReporter {
        current: ClientState::None,
        sender: state_sender,
    };

    tracing::info!("connecting to {}:{} for {}", url.host, url.port, url);

    let connected = tokio::select! {
        biased;
        _ = &mut stop_receiver => None,
        io = TcpIO::connect(&url.host, url.port, config.connect_timeout) => Some(io),
    };
    let io = match connected {
        None => {
            states.set(ClientState::NotConnected);
            return Ok(());
        }
        Some(Ok(io)) => io,
        Some(Err(err)) => {
            tracing::error!("connect to {}:{} failed: {err}", url.host, url.port);
            states.set(ClientState::Error);
            return Err(err.into());
        }
    };
    states.set(ClientState::Connected);

    let mut session = PublisherSession {
        url,
        config,
        io: Box::new(io),
        packetizer: ChunkPacketizer::new(),
        unpacketizer: ChunkUnpacketizer::new(),
        net_connection: NetConnection::new(),
        net_stream: NetStreamWriter::new(),
        states,
        media_receiver,
        stats,
        throughput,
        transaction_id: 0,
        tracked_commands: HashMap::new(),
        stream_id: 0,
        stream_created: false,
        bytes_received: 0,
        last_acknowledged: 0,
        ack_window: 0,
    };

    let result = session.run(&mut stop_receiver).await;
    if let Err(err) = &result {
        tracing::error!("rtmp publish session failed: {err}");
        session.states.set(ClientState::Error);
    }
    result
}

struct PublisherSession {
    url: RtmpUrl,
    config: PublisherConfig,
    io: Box<dyn TNetIO>,
    packetizer: ChunkPacketizer,
    unpacketizer: ChunkUnpacketizer,
    net_connection: NetConnection,
    net_stream: NetStreamWriter,
    states: StateReporter,
    media_receiver: mpsc::Receiver<FlvTag>,
    stats: Arc<PublisherStats>,
    throughput: Option<Arc<TcpThroughputAdaptation>>,

    transaction_id: u32,
    tracked_commands: HashMap<u32, &'static str>,
    stream_id: u32,
    stream_created: bool,

    bytes_received: u64,
    last_acknowledged: u64,
    ack_window: u32,
}

impl PublisherSession {
    async fn run(&mut self, stop_receiver: &mut oneshot::Receiver<()>) -> Result<(), SessionError> {
        let handshake_timeout = self.config.handshake_timeout;
        let handshake = tokio::select! {
            biased;
            _ = &mut *stop_receiver => None,
            result = timeout(handshake_timeout, self.handshake()) => Some(result),
        };
        let remaining = match handshake {
            None => {
                self.states.set(ClientState::NotConnected);
                return Ok(());
            }
            Some(Err(_elapsed)) => return Err(SessionErrorValue::Timeout.into()),
            Some(Ok(result)) => result?,
        };

        self.connect().await?;
        if !remaining.is_empty() {
            self.on_data(remaining).await?;
        }

        loop {
            let media_open = self.states.current() == ClientState::SessionStarted;

            let event = tokio::select! {
                biased;
                _ = &mut *stop_receiver => LoopEvent::Stop,
                data = self.io.read() => LoopEvent::Data(data),
                tag = self.media_receiver.recv(), if media_open => LoopEvent::Media(tag),
            };

            match event {
                LoopEvent::Stop | LoopEvent::Media(None) => {
                    self.finish().await;
                    return Ok(());
                }
                LoopEvent::Data(Ok(data)) => self.on_data(data).await?,
                LoopEvent::Data(Err(err)) if err.is_closed() => {
                    tracing::info!("server closed the connection");
                    self.states.set(ClientState::NotConnected);
                    return Ok(());
                }
                LoopEvent::Data(Err(err)) => return Err(err.into()),
                LoopEvent::Media(Some(tag)) => self.send_media(tag).await?,
            }
        }
    }

    /// Run the handshake; yields the bytes that followed S2.
    async fn handshake(&mut self) -> Result<BytesMut, SessionError> {
        let mut client = SimpleHandshakeClient::new();

        self.io.write(SimpleHandshakeClient::c0().freeze()).await?;
        self.states.set(ClientState::Handshake0);
        let c1 = client.c1()?;
        self.io.write(c1.freeze()).await?;
        self.io.flush().await?;
        self.states.set(ClientState::Handshake1s0);

        loop {
            let data = self.io.read().await?;
            client.extend_data(&data)?;

            while let Some(event) = client.step()? {
                match event {
                    HandshakeEvent::S0Received => self.states.set(ClientState::Handshake1s1),
                    HandshakeEvent::S1Received(c2) => {
                        self.io.write(c2.freeze()).await?;
                        self.io.flush().await?;
                        self.states.set(ClientState::Handshake2);
                    }
                    HandshakeEvent::S2Received => {
                        self.states.set(ClientState::HandshakeComplete);
                        return Ok(client.extract_remaining_bytes());
                    }
                }
            }
        }
    }

    fn track(&mut self, command: &'static str) -> f64 {
        self.transaction_id += 1;
        self.tracked_commands.insert(self.transaction_id, command);
        f64::from(self.transaction_id)
    }

    async fn send(&mut self, chunk: ChunkInfo) -> Result<(), SessionError> {
        let data = self.packetizer.write_chunk(&chunk)?;
        let len = data.len();
        self.io.write(data.freeze()).await?;

        self.stats.sent_bytes.fetch_add(len as u64, Ordering::Relaxed);
        if let Some(throughput) = &self.throughput {
            throughput.add_sent_bytes_sample(len);
        }
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        let out_chunk_size = self.config.out_chunk_size;
        self.send(control_writer::write_set_chunk_size(out_chunk_size)?)
            .await?;
        self.packetizer.update_max_chunk_size(out_chunk_size as usize);

        let transaction_id = self.track(transaction::CONNECT);
        let connect =
            self.net_connection
                .write_connect(transaction_id, &self.url.app, &self.url.tc_url)?;
        self.send(connect).await?;
        self.io.flush().await?;

        tracing::debug!("sent connect for app {}", self.url.app);
        Ok(())
    }

    async fn on_data(&mut self, data: BytesMut) -> Result<(), SessionError> {
        self.bytes_received += data.len() as u64;
        self.unpacketizer.extend_data(&data)?;

        loop {
            let chunks = self.unpacketizer.read_chunks()?;
            if chunks.is_empty() {
                break;
            }
            for chunk in chunks {
                let message = MessageParser::new(chunk).parse()?;
                self.on_message(message).await?;
            }
        }

        self.maybe_acknowledge().await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn maybe_acknowledge(&mut self) -> Result<(), SessionError> {
        if self.ack_window == 0
            || self.bytes_received - self.last_acknowledged < u64::from(self.ack_window)
        {
            return Ok(());
        }
        self.last_acknowledged = self.bytes_received;
        // the sequence number wraps at 4 GB
        let sequence_number = (self.bytes_received & 0xFFFF_FFFF) as u32;
        self.send(control_writer::write_acknowledgement(sequence_number)?)
            .await
    }

    async fn on_message(&mut self, message: RtmpMessageData) -> Result<(), SessionError> {
        match message {
            RtmpMessageData::SetChunkSize { chunk_size } => {
                self.unpacketizer.update_max_chunk_size(chunk_size as usize);
            }
            RtmpMessageData::WindowAcknowledgementSize { size } => {
                tracing::debug!("window acknowledgement size: {size}");
                self.ack_window = size;
            }
            RtmpMessageData::SetPeerBandwidth { size, limit_type } => {
                tracing::debug!("peer bandwidth: {size} (limit type {limit_type})");
                self.send(control_writer::write_window_acknowledgement_size(size)?)
                    .await?;
            }
            RtmpMessageData::UserControl(UserControlEvent::PingRequest { timestamp }) => {
                self.send(event_writer::write_ping_response(timestamp)?)
                    .await?;
            }
            RtmpMessageData::UserControl(event) => {
                tracing::debug!("user control event: {event:?}");
            }
            RtmpMessageData::Amf0Command {
                command_name,
                transaction_id,
                others,
                ..
            } => {
                self.on_command(&command_name, transaction_id, &others)
                    .await?;
            }
            RtmpMessageData::Acknowledgement { sequence_number } => {
                tracing::trace!("server acknowledged {sequence_number} bytes");
            }
            RtmpMessageData::Unknown { msg_type_id } => {
                tracing::debug!("ignoring message type {msg_type_id}");
            }
            other => {
                tracing::trace!("ignoring message: {other:?}");
            }
        }
        Ok(())
    }

    async fn on_command(
        &mut self,
        command_name: &str,
        transaction_id: f64,
        others: &[Amf0ValueType],
    ) -> Result<(), SessionError> {
        let tracked = self.tracked_commands.remove(&(transaction_id as u32));

        match command_name {
            "_result" => match tracked {
                Some(transaction::CONNECT) => {
                    let play_path = self.url.play_path.clone();

                    let transaction_id = self.track(transaction::RELEASE_STREAM);
                    let release = self
                        .net_connection
                        .write_release_stream(transaction_id, &play_path)?;
                    self.send(release).await?;

                    let transaction_id = self.track(transaction::FC_PUBLISH);
                    let fc_publish = self
                        .net_connection
                        .write_fc_publish(transaction_id, &play_path)?;
                    self.send(fc_publish).await?;

                    let transaction_id = self.track(transaction::CREATE_STREAM);
                    let create_stream = self.net_connection.write_create_stream(transaction_id)?;
                    self.send(create_stream).await?;

                    self.states.set(ClientState::FcPublish);
                }
                Some(transaction::CREATE_STREAM) => {
                    match others.first().and_then(Amf0ValueType::as_f64) {
                        Some(stream_id) => self.stream_id = stream_id as u32,
                        None => tracing::warn!("unexpected createStream reply: {others:?}"),
                    }
                    self.stream_created = true;

                    let transaction_id = self.track(transaction::PUBLISH);
                    let publish = self.net_stream.write_publish(
                        transaction_id,
                        self.stream_id,
                        &self.url.play_path,
                    )?;
                    self.send(publish).await?;

                    self.states.set(ClientState::Ready);
                }
                Some(command) => tracing::debug!("{command} succeeded"),
                None => tracing::debug!("_result for untracked transaction {transaction_id}"),
            },
            "_error" => {
                let (code, description) = status_fields(others.first());
                match tracked {
                    Some(
                        command @ (transaction::CONNECT
                        | transaction::CREATE_STREAM
                        | transaction::PUBLISH),
                    ) => {
                        self.states.set(ClientState::Error);
                        return Err(SessionErrorValue::Rejected {
                            command: command.to_string(),
                            code,
                            description,
                        }
                        .into());
                    }
                    command => {
                        tracing::warn!("{command:?} failed: {code} {description}");
                    }
                }
            }
            "onStatus" => {
                let info = others.first();
                let (code, description) = status_fields(info);
                let level = info
                    .and_then(|info| info.property("level"))
                    .and_then(Amf0ValueType::as_str)
                    .unwrap_or_default();

                if code == NETSTREAM_PUBLISH_START {
                    let metadata = self
                        .net_stream
                        .write_metadata(self.stream_id, &self.config.metadata)?;
                    self.send(metadata).await?;
                    tracing::info!("publishing {}", self.url.play_path);
                    self.states.set(ClientState::SessionStarted);
                } else if level == "error" || code == NETSTREAM_PUBLISH_BADNAME {
                    self.states.set(ClientState::Error);
                    return Err(SessionErrorValue::Rejected {
                        command: transaction::PUBLISH.to_string(),
                        code,
                        description,
                    }
                    .into());
                } else {
                    tracing::debug!("onStatus {level} {code}");
                }
            }
            other => tracing::debug!("ignoring command {other}"),
        }
        Ok(())
    }

    async fn send_media(&mut self, tag: FlvTag) -> Result<(), SessionError> {
        let len = tag.data.len();
        let queued = self.stats.queued_bytes.fetch_sub(len, Ordering::Relaxed).saturating_sub(len);

        let csid = if tag.is_audio() {
            csid_type::AUDIO
        } else {
            csid_type::VIDEO
        };
        let chunk = ChunkInfo::new(
            csid,
            0,
            tag.timestamp,
            len as u32,
            tag.tag_type,
            self.stream_id,
            BytesMut::from(&tag.data[..]),
        );
        self.send(chunk).await?;
        self.io.flush().await?;

        if let Some(throughput) = &self.throughput {
            throughput.add_buffer_size_sample(queued);
        }
        Ok(())
    }

    /// Flush queued media, send deleteStream if a stream exists, then report
    /// the session closed.
    async fn finish(&mut self) {
        if self.states.current() == ClientState::SessionStarted {
            while let Ok(tag) = self.media_receiver.try_recv() {
                if let Err(err) = self.send_media(tag).await {
                    tracing::warn!("flushing media on end failed: {err}");
                    break;
                }
            }
        }

        if self.stream_created {
            let transaction_id = self.track(transaction::DELETE_STREAM);
            let result = match self.net_stream.write_delete_stream(transaction_id, self.stream_id) {
                Ok(chunk) => self.send(chunk).await,
                Err(err) => Err(err.into()),
            };
            let result = match result {
                Ok(()) => self.io.flush().await.map_err(SessionError::from),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::warn!("deleteStream failed: {err}");
            }
        }
        self.states.set(ClientState::NotConnected);
    }
}

fn status_fields(info: Option<&Amf0ValueType>) -> (String, String) {
    let field = |key: &str| {
        info.and_then(|info| info.property(key))
            .and_then(Amf0ValueType::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("code"), field("description"))
}

#[cfg(test)]
mod tests {
    use super::{StateReporter, ClientState};
    use tokio::sync::mpsc;

    #[test]
    fn test_states_only_move_forward() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut states = StateReporter {
            current: ClientState::None,
            sender,
        };

        states.set(ClientState::Connected);
        states.set(ClientState::Handshake0);
        states.set(ClientState::Connected);
        states.set(ClientState::Error);
        states.set(ClientState::NotConnected);

        assert_eq!(receiver.try_recv().unwrap(), ClientState::Connected);
        assert_eq!(receiver.try_recv().unwrap(), ClientState::Handshake0);
        assert_eq!(receiver.try_recv().unwrap(), ClientState::Error);
        assert!(receiver.try_recv().is_err());
    }
}
