//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// HTTP surface configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Interval of SSE keep-alive comments on idle streams
    pub sse_keep_alive: Duration,

    /// Largest inbound WebSocket message accepted
    pub ws_max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            sse_keep_alive: Duration::from_secs(15),
            ws_max_message_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the SSE keep-alive interval
    pub fn sse_keep_alive(mut self, interval: Duration) -> Self {
        self.sse_keep_alive = interval;
        self
    }

    /// Set the largest inbound WebSocket message
    pub fn ws_max_message_size(mut self, size: usize) -> Self {
        self.ws_max_message_size = size;
        self
    }
}
