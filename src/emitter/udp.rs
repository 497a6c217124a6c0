//! UDP transport to the local trace daemon.
//!
//! Each finished segment is sent as one datagram: a fixed JSON header line
//! followed by the segment document. Sends are fire-and-forget; the daemon
//! being down must not slow down or fail request handling.

use std::net::{SocketAddr, UdpSocket};

use crate::config::ConfigError;
use crate::emitter::Emitter;
use crate::metrics;
use crate::segment::Segment;

const DAEMON_HEADER: &str = "{\"format\": \"json\", \"version\": 1}\n";

/// Emitter that sends segments to a trace daemon over UDP.
pub struct UdpEmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpEmitter {
    /// Bind a local socket for sending to `daemon_address`.
    pub fn new(daemon_address: &str) -> Result<Self, ConfigError> {
        let target: SocketAddr = daemon_address
            .parse()
            .map_err(|_| ConfigError::InvalidDaemonAddress(daemon_address.to_string()))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Emitter for UdpEmitter {
    fn emit(&self, segment: &Segment) {
        let wire = match segment.to_wire() {
            Ok(wire) => wire,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize segment");
                metrics::record_emit_failure("udp");
                return;
            }
        };

        let datagram = format!("{}{}", DAEMON_HEADER, wire);
        match self.socket.send_to(datagram.as_bytes(), self.target) {
            Ok(_) => metrics::record_segment_emitted("udp"),
            Err(err) => {
                tracing::warn!(
                    daemon = %self.target,
                    error = %err,
                    "Failed to send segment to trace daemon"
                );
                metrics::record_emit_failure("udp");
            }
        }
    }
}
