#![allow(dead_code)]
//! Test harness utilities for capneg-net integration tests.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use capneg_core::{HostConfig, ProfileDelegate};
use capneg_net::framing::{read_message, write_message};
use capneg_net::protocol::Packet;
use capneg_net::server::ProfileServer;
use capneg_types::{
    ChannelInGroup, Header, Message, Muid, ProfileId, IMPLEMENTATION_VERSION,
};

pub const SERVER_MUID: u32 = 0x0123456;

pub fn profile(n: u8) -> ProfileId {
    ProfileId::new([0x7e, 0x40, n, 0x01, 0x01])
}

/// Bind a server on an ephemeral port with the default config.
pub fn bind_server<D: ProfileDelegate>(delegate: D) -> (ProfileServer<D>, String) {
    let config = HostConfig::load();
    let server = ProfileServer::bind("127.0.0.1:0", &config, delegate).unwrap();
    let addr = server.local_addr().unwrap().to_string();
    (server, addr)
}

/// Drive the server (accept + poll) until the expected peer count is reached, or timeout.
pub fn drive_until_peers<D: ProfileDelegate>(
    server: &mut ProfileServer<D>,
    expected: usize,
    timeout: Duration,
) {
    let start = Instant::now();
    while Instant::now().duration_since(start) < timeout {
        server.accept_connections();
        server.poll();
        if server.peer_count() >= expected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "Timed out waiting for {} peers (have {})",
        expected,
        server.peer_count()
    );
}

/// Drive the server until it has handled `expected` packets, or timeout.
pub fn drive_until_handled<D: ProfileDelegate>(
    server: &mut ProfileServer<D>,
    expected: usize,
    timeout: Duration,
) {
    let start = Instant::now();
    let mut handled = 0;
    while Instant::now().duration_since(start) < timeout {
        server.accept_connections();
        handled += server.poll();
        if handled >= expected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("Timed out waiting for {} handled packets (have {})", expected, handled);
}

/// A raw TCP peer for protocol-level tests.
///
/// Tests are single-threaded, so every exchange is split:
/// 1. `request()` or `send()` to write the request
/// 2. Drive the server with `drive_until_handled()`
/// 3. `recv()` to read the reply
pub struct RawPeer {
    pub muid: Muid,
    pub reader: BufReader<TcpStream>,
    pub writer: BufWriter<TcpStream>,
}

impl RawPeer {
    /// Connect to a server via TCP.
    pub fn connect(addr: &str, muid: u32) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            muid: Muid::new(muid),
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Header for a request from this peer to the server.
    pub fn header(&self, channel: ChannelInGroup, message: &Message) -> Header {
        Header {
            channel,
            kind: message.kind(),
            version: IMPLEMENTATION_VERSION,
            source: self.muid,
            destination: Muid::new(SERVER_MUID),
        }
    }

    /// Send `message` on `group` to the server.
    pub fn request(&mut self, group: u8, channel: ChannelInGroup, message: Message) -> std::io::Result<()> {
        let header = self.header(channel, &message);
        self.send(&Packet::new(group, header, message))
    }

    pub fn send(&mut self, packet: &Packet) -> std::io::Result<()> {
        write_message(&mut self.writer, packet)
    }

    pub fn recv(&mut self) -> std::io::Result<Packet> {
        read_message(&mut self.reader)
    }

    /// Assert nothing arrives within a short window.
    pub fn expect_silence(&mut self) {
        self.reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let result = self.recv();
        self.reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        match result {
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Ok(packet) => panic!("Expected silence, got {:?}", packet),
            Err(e) => panic!("Unexpected read error: {}", e),
        }
    }
}
