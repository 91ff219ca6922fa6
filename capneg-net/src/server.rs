//! Network server that answers profile negotiation over TCP.
//!
//! Accepts peer connections, feeds each inbound packet to a [`ProfileHost`],
//! sends replies back to the requester and broadcasts notifications to every
//! connected peer.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{debug, error, info, warn};

use capneg_core::{HostConfig, ProfileDelegate, ProfileHost};
use capneg_types::Muid;

use crate::framing::{read_message, write_message};
use crate::output::{ChannelOutput, PacketResponder};
use crate::protocol::{Packet, PeerId};

/// A connected peer with its write half.
struct PeerConnection {
    addr: SocketAddr,
    writer: BufWriter<TcpStream>,
}

impl PeerConnection {
    fn send(&mut self, packet: &Packet) -> io::Result<()> {
        write_message(&mut self.writer, packet)
    }
}

/// What a reader thread reports about its peer.
enum Inbound {
    Packet(Packet),
    Closed,
}

/// TCP front end for one responder endpoint.
pub struct ProfileServer<D> {
    listener: TcpListener,
    muid: Muid,
    peers: HashMap<PeerId, PeerConnection>,
    inbound_rx: Receiver<(PeerId, Inbound)>,
    inbound_tx: Sender<(PeerId, Inbound)>,
    /// Notifications produced by the host's local API.
    outbox: Receiver<Packet>,
    next_peer_id: u64,
    host: ProfileHost<ChannelOutput, D>,
}

impl<D: ProfileDelegate> ProfileServer<D> {
    /// Bind the server to an address, building the host from `config`.
    pub fn bind(addr: &str, config: &HostConfig, delegate: D) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let (inbound_tx, inbound_rx) = mpsc::channel();
        let (outbox_tx, outbox) = mpsc::channel();

        let muid = config.muid();
        let host = ProfileHost::from_config(config, ChannelOutput::new(muid, outbox_tx), delegate);

        info!("ProfileServer {} listening on {}", muid, listener.local_addr()?);

        Ok(Self {
            listener,
            muid,
            peers: HashMap::new(),
            inbound_rx,
            inbound_tx,
            outbox,
            next_peer_id: 0,
            host,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn muid(&self) -> Muid {
        self.muid
    }

    pub fn host(&self) -> &ProfileHost<ChannelOutput, D> {
        &self.host
    }

    /// Local API access. Notifications it produces go out on the next
    /// [`poll`](Self::poll) or [`flush_notifications`](Self::flush_notifications).
    pub fn host_mut(&mut self) -> &mut ProfileHost<ChannelOutput, D> {
        &mut self.host
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Accept any pending TCP connections.
    pub fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let peer_id = PeerId::new(self.next_peer_id);
                    self.next_peer_id += 1;

                    // Some platforms hand out sockets inheriting the listener's mode.
                    if let Err(e) = stream.set_nonblocking(false) {
                        error!("Failed to configure stream from {}: {}", addr, e);
                        continue;
                    }

                    let read_stream = match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to clone stream: {}", e);
                            continue;
                        }
                    };

                    let inbound_tx = self.inbound_tx.clone();
                    thread::spawn(move || {
                        peer_reader_thread(peer_id, read_stream, inbound_tx);
                    });

                    self.peers.insert(
                        peer_id,
                        PeerConnection {
                            addr,
                            writer: BufWriter::new(stream),
                        },
                    );

                    info!("Peer {:?} connected from {}", peer_id, addr);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// Handle every packet received so far, then deliver pending
    /// notifications. Returns how many packets the host handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;

        while let Ok((peer_id, inbound)) = self.inbound_rx.try_recv() {
            match inbound {
                Inbound::Packet(packet) => {
                    if self.handle_packet(peer_id, packet) {
                        handled += 1;
                    }
                }
                Inbound::Closed => {
                    if let Some(peer) = self.peers.remove(&peer_id) {
                        info!("Peer {:?} ({}) disconnected", peer_id, peer.addr);
                    }
                }
            }
        }

        self.flush_notifications();
        handled
    }

    /// Broadcast notifications queued by the host's local API.
    pub fn flush_notifications(&mut self) {
        while let Ok(packet) = self.outbox.try_recv() {
            self.broadcast(&packet);
        }
    }

    fn handle_packet(&mut self, peer_id: PeerId, packet: Packet) -> bool {
        let destination = packet.header.destination;
        if destination != self.muid && !destination.is_broadcast() {
            debug!("Ignoring packet from {:?} addressed to {}", peer_id, destination);
            return false;
        }

        let mut responder = PacketResponder::new(self.muid, &packet);
        if !self.host.try_respond(&mut responder, &packet.message) {
            debug!("Peer {:?} sent unhandled {:?}", peer_id, packet.header.kind);
            return false;
        }

        // Notifications the delegate triggered go out before the reply.
        self.flush_notifications();

        for reply in responder.into_replies() {
            if reply.is_broadcast() {
                self.broadcast(&reply);
            } else {
                self.send_to(peer_id, &reply);
            }
        }
        true
    }

    fn send_to(&mut self, peer_id: PeerId, packet: &Packet) {
        let failed = match self.peers.get_mut(&peer_id) {
            Some(peer) => match peer.send(packet) {
                Ok(()) => false,
                Err(e) => {
                    warn!("Failed to send to peer {:?}: {}", peer_id, e);
                    true
                }
            },
            None => {
                debug!("Reply for departed peer {:?} dropped", peer_id);
                false
            }
        };
        if failed {
            self.peers.remove(&peer_id);
        }
    }

    /// Send a packet to all connected peers.
    fn broadcast(&mut self, packet: &Packet) {
        let mut disconnected = Vec::new();

        for (id, peer) in &mut self.peers {
            if let Err(e) = peer.send(packet) {
                warn!("Failed to send to peer {:?}: {}", id, e);
                disconnected.push(*id);
            }
        }

        for id in disconnected {
            self.peers.remove(&id);
        }
    }
}

/// Background thread that reads packets from a peer and forwards them.
fn peer_reader_thread(peer_id: PeerId, stream: TcpStream, inbound_tx: Sender<(PeerId, Inbound)>) {
    let mut reader = BufReader::new(stream);

    loop {
        match read_message::<_, Packet>(&mut reader) {
            Ok(packet) => {
                if inbound_tx.send((peer_id, Inbound::Packet(packet))).is_err() {
                    // Receiver dropped, server is shutting down
                    break;
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    warn!("Peer {:?} read error: {}", peer_id, e);
                }
                let _ = inbound_tx.send((peer_id, Inbound::Closed));
                break;
            }
        }
    }

    debug!("Peer {:?} reader thread exiting", peer_id);
}
