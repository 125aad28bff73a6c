//! Publisher tests against an in-process RTMP server.
//!
//! Run with: cargo test -p livecast-rtmp --test publisher_tests

use bytes::{Bytes, BytesMut};
use livecast_rtmp::{
    flv::{
        amf0::{amf0_writer::Amf0Writer, Amf0Object, Amf0ValueType},
        define::{tag_type, FlvTag},
    },
    rtmp::{
        chunk::{
            define::csid_type, packetizer::ChunkPacketizer, unpacketizer::ChunkUnpacketizer,
            ChunkInfo,
        },
        messages::{
            define::{msg_type_id, RtmpMessageData, UserControlEvent},
            parser::MessageParser,
        },
        protocol_control_messages::writer as control_writer,
        session::errors::SessionErrorValue,
    },
    ClientState, PublisherConfig, PushOutcome, RtmpPublisher, RtmpUrl,
};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};

const HANDSHAKE_SIZE: usize = 1536;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    ChunkSize(u32),
    Command { name: String, stream_id: u32 },
    Data(String),
    Video { csid: u32, stream_id: u32, key: bool },
    Audio,
    Acknowledgement,
    WindowAckSize(u32),
    PingResponse(u32),
    Other,
}

#[derive(Clone, Copy)]
enum Behaviour {
    Accept,
    RejectPublish,
    CloseOnConnect,
    /// Small ack window, peer bandwidth, a ping and filler before `_result`.
    ControlTraffic,
}

struct MockServer {
    stream: TcpStream,
    packetizer: ChunkPacketizer,
    unpacketizer: ChunkUnpacketizer,
    seen: Vec<Seen>,
}

impl MockServer {
    async fn handshake(stream: &mut TcpStream) {
        let mut c0c1 = vec![0_u8; 1 + HANDSHAKE_SIZE];
        stream.read_exact(&mut c0c1).await.unwrap();
        assert_eq!(c0c1[0], 3, "client must speak rtmp version 3");
        let c1 = &c0c1[1..];
        assert_eq!(&c1[4..8], &[0, 0, 0, 0]);

        let s1: Vec<u8> = (0..HANDSHAKE_SIZE).map(|i| (i % 251) as u8).collect();
        let mut reply = vec![3_u8];
        reply.extend_from_slice(&s1);
        reply.extend_from_slice(c1);
        stream.write_all(&reply).await.unwrap();

        let mut c2 = vec![0_u8; HANDSHAKE_SIZE];
        stream.read_exact(&mut c2).await.unwrap();
        assert_eq!(&c2[..4], &s1[..4]);
        assert_eq!(&c2[4..8], &[0, 0, 0, 0]);
        assert_eq!(&c2[8..], &s1[8..]);
    }

    async fn send(&mut self, chunk: ChunkInfo) {
        let data = self.packetizer.write_chunk(&chunk).unwrap();
        self.stream.write_all(&data).await.unwrap();
    }

    async fn send_command(&mut self, values: &[Amf0ValueType], stream_id: u32) {
        let mut writer = Amf0Writer::new();
        writer.write_anys(values).unwrap();
        let payload = writer.extract_current_bytes();
        let chunk = ChunkInfo::new(
            csid_type::COMMAND_AMF0,
            0,
            0,
            payload.len() as u32,
            msg_type_id::COMMAND_AMF0,
            stream_id,
            payload,
        );
        self.send(chunk).await;
    }

    async fn send_raw(&mut self, csid: u32, msg_type_id: u8, payload: &[u8]) {
        let chunk = ChunkInfo::new(
            csid,
            0,
            0,
            payload.len() as u32,
            msg_type_id,
            0,
            BytesMut::from(payload),
        );
        self.send(chunk).await;
    }

    async fn send_control_traffic(&mut self) {
        // SetPeerBandwidth 5_000_000, dynamic
        self.send_raw(
            csid_type::PROTOCOL_USER_CONTROL,
            msg_type_id::SET_PEER_BANDWIDTH,
            &[0x00, 0x4C, 0x4B, 0x40, 0x02],
        )
        .await;
        // PingRequest
        self.send_raw(
            csid_type::PROTOCOL_USER_CONTROL,
            msg_type_id::USER_CONTROL_EVENT,
            &[0x00, 0x06, 0x01, 0x02, 0x03, 0x04],
        )
        .await;
        // unknown message type, only there to push the byte count past the window
        for _ in 0..2 {
            self.send_raw(csid_type::COMMAND_AMF0, 42, &[0x5A; 80]).await;
        }
    }

    async fn on_command(&mut self, name: &str, transaction_id: f64, behaviour: Behaviour) {
        match name {
            "connect" => {
                let window = match behaviour {
                    Behaviour::ControlTraffic => 64,
                    _ => 2_500_000,
                };
                self.send(control_writer::write_window_acknowledgement_size(window).unwrap())
                    .await;
                if matches!(behaviour, Behaviour::ControlTraffic) {
                    self.send_control_traffic().await;
                }
                self.send(control_writer::write_set_chunk_size(4096).unwrap())
                    .await;
                self.packetizer.update_max_chunk_size(4096);
                self.send_command(
                    &[
                        string("_result"),
                        Amf0ValueType::Number(transaction_id),
                        Amf0ValueType::Null,
                        status("status", "NetConnection.Connect.Success"),
                    ],
                    0,
                )
                .await;
            }
            "createStream" => {
                self.send_command(
                    &[
                        string("_result"),
                        Amf0ValueType::Number(transaction_id),
                        Amf0ValueType::Null,
                        Amf0ValueType::Number(1.0),
                    ],
                    0,
                )
                .await;
            }
            "publish" => {
                let info = match behaviour {
                    Behaviour::RejectPublish => status("error", "NetStream.Publish.BadName"),
                    _ => status("status", "NetStream.Publish.Start"),
                };
                self.send_command(
                    &[
                        string("onStatus"),
                        Amf0ValueType::Number(0.0),
                        Amf0ValueType::Null,
                        info,
                    ],
                    1,
                )
                .await;
            }
            _ => {}
        }
    }

    /// Serve one client until it disconnects and return what it sent.
    async fn serve(listener: TcpListener, behaviour: Behaviour) -> Vec<Seen> {
        let (mut stream, _) = listener.accept().await.unwrap();
        Self::handshake(&mut stream).await;

        let mut server = Self {
            stream,
            packetizer: ChunkPacketizer::new(),
            unpacketizer: ChunkUnpacketizer::new(),
            seen: Vec::new(),
        };

        let mut buf = vec![0_u8; 64 * 1024];
        loop {
            let n = match server.stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            server.unpacketizer.extend_data(&buf[..n]).unwrap();

            loop {
                let chunks = server.unpacketizer.read_chunks().unwrap();
                if chunks.is_empty() {
                    break;
                }
                for chunk in chunks {
                    let csid = chunk.basic_header.chunk_stream_id;
                    let stream_id = chunk.message_header.msg_stream_id;
                    match MessageParser::new(chunk).parse().unwrap() {
                        RtmpMessageData::SetChunkSize { chunk_size } => {
                            server.unpacketizer.update_max_chunk_size(chunk_size as usize);
                            server.seen.push(Seen::ChunkSize(chunk_size));
                        }
                        RtmpMessageData::Amf0Command {
                            command_name,
                            transaction_id,
                            ..
                        } => {
                            server.seen.push(Seen::Command {
                                name: command_name.clone(),
                                stream_id,
                            });
                            if matches!(behaviour, Behaviour::CloseOnConnect) {
                                return server.seen;
                            }
                            server
                                .on_command(&command_name, transaction_id, behaviour)
                                .await;
                        }
                        RtmpMessageData::Amf0Data { values } => {
                            let name = values
                                .iter()
                                .filter_map(Amf0ValueType::as_str)
                                .collect::<Vec<_>>()
                                .join(" ");
                            server.seen.push(Seen::Data(name));
                        }
                        RtmpMessageData::VideoData { data } => server.seen.push(Seen::Video {
                            csid,
                            stream_id,
                            key: data[0] >> 4 == 1,
                        }),
                        RtmpMessageData::AudioData { .. } => server.seen.push(Seen::Audio),
                        RtmpMessageData::Acknowledgement { .. } => {
                            server.seen.push(Seen::Acknowledgement);
                        }
                        RtmpMessageData::WindowAcknowledgementSize { size } => {
                            server.seen.push(Seen::WindowAckSize(size));
                        }
                        RtmpMessageData::UserControl(UserControlEvent::PingResponse {
                            timestamp,
                        }) => server.seen.push(Seen::PingResponse(timestamp)),
                        _ => server.seen.push(Seen::Other),
                    }
                }
            }
        }

        server.seen
    }
}

fn string(value: &str) -> Amf0ValueType {
    Amf0ValueType::UTF8String(value.to_string())
}

fn status(level: &str, code: &str) -> Amf0ValueType {
    let mut info = Amf0Object::new();
    info.insert("level".to_string(), string(level));
    info.insert("code".to_string(), string(code));
    info.insert("description".to_string(), string("mock"));
    Amf0ValueType::Object(info)
}

async fn start_server(behaviour: Behaviour) -> (RtmpUrl, JoinHandle<Vec<Seen>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = RtmpUrl::with_stream_key(&format!("rtmp://127.0.0.1:{port}/live"), "test").unwrap();
    (url, tokio::spawn(MockServer::serve(listener, behaviour)))
}

async fn wait_for(states: &mut mpsc::UnboundedReceiver<ClientState>, wanted: ClientState) -> Vec<ClientState> {
    let mut history = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(state) = states.recv().await {
            history.push(state);
            if state == wanted || state.is_terminal() {
                break;
            }
        }
    })
    .await
    .unwrap();
    history
}

fn video_tag(timestamp: u32, key: bool, sequence_header: bool) -> FlvTag {
    let first = if key { 0x17 } else { 0x27 };
    let packet_type = u8::from(!sequence_header);
    FlvTag {
        tag_type: tag_type::VIDEO,
        timestamp,
        data: Bytes::from(vec![first, packet_type, 0, 0, 0, 0xAA, 0xBB]),
        is_key_frame: key,
        is_sequence_header: sequence_header,
    }
}

#[tokio::test]
async fn test_publish_session_lifecycle() {
    let (url, server) = start_server(Behaviour::Accept).await;
    let (publisher, mut states) = RtmpPublisher::start(url, PublisherConfig::default(), None);

    let history = wait_for(&mut states, ClientState::SessionStarted).await;
    assert_eq!(
        history,
        vec![
            ClientState::Connected,
            ClientState::Handshake0,
            ClientState::Handshake1s0,
            ClientState::Handshake1s1,
            ClientState::Handshake2,
            ClientState::HandshakeComplete,
            ClientState::FcPublish,
            ClientState::Ready,
            ClientState::SessionStarted,
        ]
    );

    assert_eq!(
        publisher.push(video_tag(0, true, true)).await.unwrap(),
        PushOutcome::Queued
    );
    assert_eq!(
        publisher.push(video_tag(0, true, false)).await.unwrap(),
        PushOutcome::Queued
    );
    let stats = std::sync::Arc::clone(publisher.stats());
    publisher.end().await.unwrap();

    assert_eq!(states.recv().await, Some(ClientState::NotConnected));
    assert!(stats.sent_bytes() > 0);
    assert_eq!(stats.queued_bytes(), 0);

    let seen = server.await.unwrap();
    let command = |name: &str, stream_id: u32| Seen::Command {
        name: name.to_string(),
        stream_id,
    };
    assert_eq!(
        seen,
        vec![
            Seen::ChunkSize(4096),
            command("connect", 0),
            command("releaseStream", 0),
            command("FCPublish", 0),
            command("createStream", 0),
            command("publish", 1),
            Seen::Data("@setDataFrame onMetaData".to_string()),
            Seen::Video {
                csid: csid_type::VIDEO,
                stream_id: 1,
                key: true
            },
            Seen::Video {
                csid: csid_type::VIDEO,
                stream_id: 1,
                key: true
            },
            command("deleteStream", 0),
        ]
    );
}

#[tokio::test]
async fn test_publish_rejected() {
    let (url, server) = start_server(Behaviour::RejectPublish).await;
    let (publisher, mut states) = RtmpPublisher::start(url, PublisherConfig::default(), None);

    let history = wait_for(&mut states, ClientState::SessionStarted).await;
    assert_eq!(history.last(), Some(&ClientState::Error));
    assert!(history.contains(&ClientState::Ready));

    let err = publisher.end().await.unwrap_err();
    match err.value {
        SessionErrorValue::Rejected { code, .. } => assert_eq!(code, "NetStream.Publish.BadName"),
        other => panic!("unexpected error: {other}"),
    }
    // nothing follows a terminal state
    assert_eq!(states.recv().await, None);

    let seen = server.await.unwrap();
    assert!(!seen.contains(&Seen::Data("@setDataFrame onMetaData".to_string())));
}

#[tokio::test]
async fn test_server_close_reports_not_connected() {
    let (url, server) = start_server(Behaviour::CloseOnConnect).await;
    let (publisher, mut states) = RtmpPublisher::start(url, PublisherConfig::default(), None);

    let history = wait_for(&mut states, ClientState::SessionStarted).await;
    assert_eq!(history.last(), Some(&ClientState::NotConnected));
    assert!(history.contains(&ClientState::HandshakeComplete));
    assert!(publisher.end().await.is_ok());
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_reports_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = RtmpUrl::parse(&format!("rtmp://127.0.0.1:{port}/live/test")).unwrap();
    let (publisher, mut states) = RtmpPublisher::start(url, PublisherConfig::default(), None);

    let history = wait_for(&mut states, ClientState::Connected).await;
    assert_eq!(history, vec![ClientState::Error]);
    assert!(publisher.end().await.is_err());
}

#[tokio::test]
async fn test_inter_frames_dropped_when_queue_full() {
    let (url, server) = start_server(Behaviour::Accept).await;
    let config = PublisherConfig {
        media_queue_capacity: 1,
        ..PublisherConfig::default()
    };
    let (publisher, mut states) = RtmpPublisher::start(url, config, None);

    // media is not consumed before the stream is published, so the queue fills
    let first = publisher.push(video_tag(0, false, false)).await.unwrap();
    let second = publisher.push(video_tag(33, false, false)).await.unwrap();
    assert_eq!(first, PushOutcome::Queued);
    assert_eq!(second, PushOutcome::Dropped);
    assert_eq!(publisher.stats().dropped_frames(), 1);

    wait_for(&mut states, ClientState::SessionStarted).await;
    publisher.end().await.unwrap();

    let seen = server.await.unwrap();
    let videos = seen
        .iter()
        .filter(|seen| matches!(seen, Seen::Video { .. }))
        .count();
    assert_eq!(videos, 1);
}

#[tokio::test]
async fn test_protocol_control_replies() {
    let (url, server) = start_server(Behaviour::ControlTraffic).await;
    let (publisher, mut states) = RtmpPublisher::start(url, PublisherConfig::default(), None);

    let history = wait_for(&mut states, ClientState::SessionStarted).await;
    assert_eq!(history.last(), Some(&ClientState::SessionStarted));
    publisher.end().await.unwrap();

    let seen = server.await.unwrap();
    assert!(seen.contains(&Seen::WindowAckSize(5_000_000)));
    assert!(seen.contains(&Seen::PingResponse(0x0102_0304)));
    assert!(seen.contains(&Seen::Acknowledgement));

    // replies to control messages go out before the commands answering `_result`
    let position = |wanted: &Seen| seen.iter().position(|seen| seen == wanted).unwrap();
    let connect = position(&Seen::Command {
        name: "connect".to_string(),
        stream_id: 0,
    });
    let release_stream = position(&Seen::Command {
        name: "releaseStream".to_string(),
        stream_id: 0,
    });
    for reply in [Seen::WindowAckSize(5_000_000), Seen::PingResponse(0x0102_0304)] {
        let at = position(&reply);
        assert!(connect < at && at < release_stream, "{reply:?} at {at} in {seen:?}");
    }
    assert!(position(&Seen::Acknowledgement) > connect);
}
