//! FNE master link endpoint.
//!
//! One UDP socket per endpoint, connected to the master so the OS discards
//! datagrams from other sources. The link walks the login chain
//! (`WaitingConnect → WaitingLogin → WaitingAuthorisation → WaitingConfig →
//! Running`) driven by a retry timer that also resends the pending message,
//! and a 60-second master timeout that forces a full reconnect. Traffic is
//! queued per protocol and handed out one frame per tick so neither
//! direction starves the other.
//!
//! A NAK while `Running` downgrades to `WaitingLogin`; in any other state it
//! forces a reconnect. Writes while the link is not `Running` are dropped
//! with a debug log - call state lives in the machines, which keep running
//! and resume audio once the link is back.

use std::collections::VecDeque;
use std::net::SocketAddr;

use crossmode_core::{CallContext, Timer};
use crossmode_proto::dmr::{DataType, DmrData};
use crossmode_proto::fne::{self, LinkState, PeerMetadata};
use crossmode_proto::p25::{Duid, LduBuffer, LduKind, P25Record};
use tokio::net::UdpSocket;

use crate::config::NetworkSection;
use crate::error::HostError;

/// Resend / keepalive interval.
const RETRY_MS: u32 = 10_000;

/// Master liveness timeout.
const TIMEOUT_MS: u32 = 60_000;

/// Bound on each receive queue; the oldest frame is dropped beyond it.
const RX_QUEUE_LIMIT: usize = 120;

/// Endpoint configuration, lifted from one `srcNetwork`/`dstNetwork`
/// section.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Master hostname or address
    pub address: String,
    /// Master port
    pub port: u16,
    /// Local port (0 for ephemeral)
    pub local: u16,
    /// Peer id presented at login
    pub id: u32,
    /// Login password
    pub password: String,
    /// Accept slot 1 traffic
    pub slot1: bool,
    /// Accept slot 2 traffic
    pub slot2: bool,
    /// Datagram-level debug logging
    pub debug: bool,
}

impl From<&NetworkSection> for NetworkConfig {
    fn from(section: &NetworkSection) -> Self {
        Self {
            address: section.address.clone(),
            port: section.port,
            local: section.local,
            id: section.id,
            password: section.password.clone(),
            slot1: section.slot1,
            slot2: section.slot2,
            debug: section.debug,
        }
    }
}

/// One FNE master link.
pub struct FneNetwork {
    config: NetworkConfig,
    metadata: PeerMetadata,
    remote: SocketAddr,
    socket: Option<UdpSocket>,
    state: LinkState,
    salt: [u8; 4],
    retry_timer: Timer,
    timeout_timer: Timer,
    enabled: bool,
    stream_id: u32,
    rx_dmr: VecDeque<DmrData>,
    rx_p25: VecDeque<P25Record>,
}

impl FneNetwork {
    /// Create a closed endpoint. `open` must be called before ticking.
    pub fn new(config: NetworkConfig, metadata: PeerMetadata) -> Result<Self, HostError> {
        let remote = resolve(&config.address, config.port)?;
        Ok(Self {
            config,
            metadata,
            remote,
            socket: None,
            state: LinkState::WaitingConnect,
            salt: [0; 4],
            retry_timer: Timer::new(RETRY_MS),
            timeout_timer: Timer::new(TIMEOUT_MS),
            enabled: false,
            stream_id: 0,
            rx_dmr: VecDeque::new(),
            rx_p25: VecDeque::new(),
        })
    }

    /// Open (or reopen) the socket and restart the connect sequence.
    pub async fn open(&mut self) -> Result<(), HostError> {
        let local: SocketAddr = format!("0.0.0.0:{}", self.config.local)
            .parse()
            .map_err(|_| HostError::AddressResolve(self.config.address.clone()))?;
        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.remote).await?;
        self.socket = Some(socket);

        self.state = LinkState::WaitingConnect;
        self.timeout_timer.stop();
        self.retry_timer.start();
        tracing::debug!("opened master link to {}", self.remote);
        Ok(())
    }

    /// Allow traffic to flow into the receive queues.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Pop one DMR frame.
    pub fn read_dmr(&mut self) -> Option<DmrData> {
        self.rx_dmr.pop_front()
    }

    /// Pop one P25 record.
    pub fn read_p25(&mut self) -> Option<P25Record> {
        self.rx_p25.pop_front()
    }

    /// Advance the link by `ms` milliseconds: drain datagrams, resend the
    /// pending handshake message or keepalive, enforce the master timeout.
    pub async fn tick(&mut self, ms: u32) {
        if self.state == LinkState::WaitingConnect {
            self.retry_timer.clock(ms);
            if self.retry_timer.is_running() && self.retry_timer.has_expired() {
                self.send(&fne::login(self.config.id));
                self.state = LinkState::WaitingLogin;
                self.timeout_timer.start();
                self.retry_timer.start();
            }
            return;
        }

        self.drain_datagrams().await;

        self.retry_timer.clock(ms);
        if self.retry_timer.is_running() && self.retry_timer.has_expired() {
            match self.state {
                LinkState::WaitingLogin => self.send(&fne::login(self.config.id)),
                LinkState::WaitingAuthorisation => {
                    let auth = fne::authorisation(self.config.id, &self.salt, &self.config.password);
                    self.send(&auth);
                },
                LinkState::WaitingConfig => {
                    let config = fne::config(self.config.id, &self.metadata);
                    self.send(&config);
                },
                LinkState::Running => self.send(&fne::ping(self.config.id)),
                LinkState::WaitingConnect => {},
            }
            self.retry_timer.start();
        }

        self.timeout_timer.clock(ms);
        if self.timeout_timer.is_running() && self.timeout_timer.has_expired() {
            tracing::error!("connection to the master has timed out, retrying connection");
            self.reopen().await;
        }
    }

    /// Send a DMR frame, stamping the peer and stream identifiers. A new
    /// stream id is drawn for every voice LC header.
    pub fn write_dmr(&mut self, frame: &DmrData) {
        if frame.data_type == DataType::VoiceLcHeader {
            self.stream_id = self.stream_id.wrapping_add(1);
        }
        let mut frame = frame.clone();
        frame.peer_id = self.config.id;
        frame.stream_id = self.stream_id;

        let mut wire = Vec::with_capacity(crossmode_proto::dmr::DMRD_LENGTH_BYTES);
        frame.encode(&mut wire);
        self.send_traffic(&wire);
    }

    /// Send a P25 LDU1 built from a call context and voice buffer.
    pub fn write_p25_ldu1(&mut self, context: &CallContext, ldu: &LduBuffer) {
        self.write_p25_ldu(Duid::Ldu1, LduKind::Ldu1, context, ldu);
    }

    /// Send a P25 LDU2.
    pub fn write_p25_ldu2(&mut self, context: &CallContext, ldu: &LduBuffer) {
        self.write_p25_ldu(Duid::Ldu2, LduKind::Ldu2, context, ldu);
    }

    /// Send a P25 terminator.
    pub fn write_p25_tdu(&mut self, context: &CallContext) {
        let record = P25Record {
            alg_id: context.alg_id,
            key_id: context.key_id,
            ..P25Record::control(
                Duid::Tdu,
                if context.group { 0x00 } else { 0x03 },
                context.src_id,
                context.dst_id,
            )
        };
        let mut wire = Vec::new();
        record.encode(&mut wire);
        self.send_traffic(&wire);
    }

    /// Close the link, notifying the master when logged in.
    pub fn close(&mut self) {
        if self.state == LinkState::Running {
            self.send(&fne::closing(self.config.id));
        }
        self.socket = None;
        self.retry_timer.stop();
        self.timeout_timer.stop();
        self.state = LinkState::WaitingConnect;
        tracing::debug!("closed master link to {}", self.remote);
    }

    fn write_p25_ldu(&mut self, duid: Duid, kind: LduKind, context: &CallContext, ldu: &LduBuffer) {
        let record = P25Record {
            duid,
            lco: if context.group { 0x00 } else { 0x03 },
            mfid: 0,
            alg_id: context.alg_id,
            key_id: context.key_id,
            src_id: context.src_id,
            dst_id: context.dst_id,
            lsd: [0; 2],
            data: ldu.build_record(kind).to_vec(),
        };
        let mut wire = Vec::new();
        record.encode(&mut wire);
        self.send_traffic(&wire);
    }

    async fn reopen(&mut self) {
        self.close();
        if let Err(e) = self.open().await {
            tracing::error!("failed to reopen the master link: {e}");
        }
    }

    async fn drain_datagrams(&mut self) {
        let mut buffer = [0u8; 2048];
        loop {
            let received = match &self.socket {
                Some(socket) => socket.try_recv(&mut buffer),
                None => return,
            };
            match received {
                Ok(length) => {
                    if self.handle_datagram(&buffer[..length]) {
                        self.reopen().await;
                        return;
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::error!("socket has failed ({e}), retrying connection to the master");
                    self.reopen().await;
                    return;
                },
            }
        }
    }

    /// Handle one datagram. Returns true when the link must reconnect.
    fn handle_datagram(&mut self, datagram: &[u8]) -> bool {
        if self.config.debug {
            tracing::debug!("network received, {} bytes", datagram.len());
        }

        if datagram.starts_with(fne::TAG_DMR_DATA) {
            if self.enabled {
                match DmrData::decode(datagram) {
                    Ok(frame) => {
                        let slot_enabled = (frame.slot_no == 1 && self.config.slot1)
                            || (frame.slot_no == 2 && self.config.slot2);
                        if slot_enabled {
                            push_bounded(&mut self.rx_dmr, frame);
                        }
                    },
                    Err(e) => tracing::warn!("malformed DMRD datagram: {e}"),
                }
            }
        } else if datagram.starts_with(fne::TAG_P25_DATA) {
            if self.enabled {
                match P25Record::decode(datagram) {
                    Ok(record) => push_bounded(&mut self.rx_p25, record),
                    Err(e) => tracing::warn!("malformed P25D datagram: {e}"),
                }
            }
        } else if datagram.starts_with(fne::TAG_MASTER_WL_RID)
            || datagram.starts_with(fne::TAG_MASTER_BL_RID)
            || datagram.starts_with(fne::TAG_MASTER_DEACTIVE_TGS)
            || datagram.starts_with(fne::TAG_MASTER_ACTIVE_TGS)
        {
            // List pushes are not used by the transcoder
        } else if datagram.starts_with(fne::TAG_MASTER_NAK) {
            if self.state == LinkState::Running {
                tracing::warn!("master returned a NAK; attempting to relogin");
                self.state = LinkState::WaitingLogin;
                self.timeout_timer.start();
                self.retry_timer.start();
            } else {
                tracing::error!("master returned a NAK; network reconnect");
                return true;
            }
        } else if datagram.starts_with(fne::TAG_REPEATER_ACK) {
            self.handle_ack(datagram);
        } else if datagram.starts_with(fne::TAG_MASTER_CLOSING) {
            tracing::error!("master is closing down");
            return true;
        } else if datagram.starts_with(fne::TAG_MASTER_PONG) {
            self.timeout_timer.start();
        } else {
            tracing::debug!("unknown packet from the master, {} bytes", datagram.len());
        }
        false
    }

    fn handle_ack(&mut self, datagram: &[u8]) {
        match self.state {
            LinkState::WaitingLogin => {
                let Some(salt) = fne::ack_salt(datagram) else {
                    tracing::warn!("login ack without a salt");
                    return;
                };
                tracing::debug!("sending authorisation");
                self.salt = salt;
                let auth = fne::authorisation(self.config.id, &self.salt, &self.config.password);
                self.send(&auth);
                self.state = LinkState::WaitingAuthorisation;
                self.timeout_timer.start();
                self.retry_timer.start();
            },
            LinkState::WaitingAuthorisation => {
                tracing::debug!("sending configuration");
                let config = fne::config(self.config.id, &self.metadata);
                self.send(&config);
                self.state = LinkState::WaitingConfig;
                self.timeout_timer.start();
                self.retry_timer.start();
            },
            LinkState::WaitingConfig => {
                tracing::info!("logged into the master successfully");
                self.state = LinkState::Running;
                self.timeout_timer.start();
                self.retry_timer.start();
            },
            LinkState::WaitingConnect | LinkState::Running => {},
        }
    }

    fn send_traffic(&mut self, wire: &[u8]) {
        if self.state != LinkState::Running {
            tracing::debug!("link not running, dropping {} outbound bytes", wire.len());
            return;
        }
        self.send(wire);
    }

    fn send(&self, wire: &[u8]) {
        let Some(socket) = &self.socket else {
            return;
        };
        if let Err(e) = socket.try_send(wire) {
            if e.kind() != std::io::ErrorKind::WouldBlock {
                tracing::warn!("send to the master failed: {e}");
            }
        }
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T) {
    if queue.len() >= RX_QUEUE_LIMIT {
        tracing::debug!("receive queue full, dropping the oldest frame");
        queue.pop_front();
    }
    queue.push_back(item);
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr, HostError> {
    use std::net::ToSocketAddrs;
    (address, port)
        .to_socket_addrs()
        .map_err(|_| HostError::AddressResolve(address.to_string()))?
        .next()
        .ok_or_else(|| HostError::AddressResolve(address.to_string()))
}
