// WebSocket connection state, reconnect policy and JSON protocol handling
//
// Browser callbacks never touch the client directly: they push `NetEvent`s tagged with
// the generation of the transport that produced them, and `GameClient::update` drains
// the queue. Events from an older generation are ignored.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use protocol::{ClientMessage, ServerMessage};
use thiserror::Error;
use tracing::{debug, info, warn};

mod websocket;

pub use websocket::WebSocketConnector;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open transport to {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("transport is not open")]
    NotOpen,
}

/// A live, message-framed connection.
pub trait Transport {
    fn send_text(&self, frame: &str) -> Result<(), TransportError>;
    fn close(&self);
}

/// Opens transports. Implementations report lifecycle through the event queue.
pub trait Connector {
    fn connect(
        &mut self,
        url: &str,
        generation: u64,
        events: EventQueue,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEventKind {
    Opened,
    Frame(String),
    Closed { code: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetEvent {
    pub generation: u64,
    pub kind: NetEventKind,
}

pub type EventQueue = Rc<RefCell<VecDeque<NetEvent>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

pub struct Connection {
    url: String,
    state: ConnectionState,
    generation: u64,
    transport: Option<Box<dyn Transport>>,
    reconnect_delay_ms: f64,
    reconnect_at: Option<f64>,
}

impl Connection {
    pub fn new(url: &str, reconnect_delay_ms: f64) -> Self {
        Self {
            url: url.to_string(),
            state: ConnectionState::Disconnected,
            generation: 0,
            transport: None,
            reconnect_delay_ms,
            reconnect_at: None,
        }
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn reconnect_at(&self) -> Option<f64> {
        self.reconnect_at
    }

    /// Open a fresh transport, retiring the previous one.
    ///
    /// A synchronous failure is handled like a closure: the reconnect timer is armed.
    pub fn open(&mut self, connector: &mut dyn Connector, events: &EventQueue, now: f64) {
        if let Some(old) = self.transport.take() {
            old.close();
        }
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!("Connecting to {} (attempt {})", self.url, self.generation);

        match connector.connect(&self.url, self.generation, events.clone()) {
            Ok(transport) => self.transport = Some(transport),
            Err(e) => {
                warn!("{e}");
                self.handle_close(self.generation, now);
            }
        }
    }

    /// Returns false for events of a retired transport.
    pub fn handle_open(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            debug!("Ignoring open from stale transport {generation}");
            return false;
        }
        self.state = ConnectionState::Connected;
        self.reconnect_at = None;
        info!("Connected to {}", self.url);
        true
    }

    /// Mark disconnected and arm the reconnect timer unless one is already pending.
    ///
    /// Returns false for events of a retired transport.
    pub fn handle_close(&mut self, generation: u64, now: f64) -> bool {
        if generation != self.generation {
            debug!("Ignoring close from stale transport {generation}");
            return false;
        }
        self.state = ConnectionState::Disconnected;
        self.transport = None;
        if self.reconnect_at.is_none() {
            self.reconnect_at = Some(now + self.reconnect_delay_ms);
            info!("Disconnected, reconnecting in {} ms", self.reconnect_delay_ms);
        }
        true
    }

    /// True once when the reconnect deadline has passed and an attempt should be made.
    pub fn poll_reconnect(&mut self, now: f64) -> bool {
        match self.reconnect_at {
            Some(at) if now >= at => {
                self.reconnect_at = None;
                // Connected in the meantime: the attempt is a no-op.
                !self.is_connected()
            }
            _ => false,
        }
    }

    /// Send a message. Silently dropped when not connected.
    pub fn send(&self, message: &ClientMessage) -> bool {
        if !self.is_connected() {
            return false;
        }
        let Some(transport) = &self.transport else {
            return false;
        };
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {message:?}: {e}");
                return false;
            }
        };
        match transport.send_text(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    /// Decode one inbound frame; malformed frames are logged and dropped.
    pub fn decode(frame: &str) -> Option<ServerMessage> {
        match ServerMessage::decode(frame) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Discarding frame: {e}");
                None
            }
        }
    }
}
