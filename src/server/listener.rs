//! Score server
//!
//! Owns the hub, its dispatcher task and the simulator, and serves the
//! routes over HTTP.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use warp::{Filter, Rejection, Reply};

use crate::error::Result;
use crate::hub::{BroadcastHub, HubConfig};
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};
use crate::simulator::{MatchSimulator, SimulatorConfig};

/// Live score server
pub struct ScoreServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    simulator: Arc<MatchSimulator>,
    dispatcher: JoinHandle<()>,
}

impl ScoreServer {
    /// Create a new server with the given configuration
    ///
    /// Must be called from within a tokio runtime; the publish dispatcher is
    /// spawned here.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hub_config(config, HubConfig::default(), SimulatorConfig::default())
    }

    /// Create a new server with custom hub and simulator configuration
    pub fn with_hub_config(
        config: ServerConfig,
        hub_config: HubConfig,
        simulator_config: SimulatorConfig,
    ) -> Self {
        let hub = Arc::new(BroadcastHub::with_config(hub_config));
        let (queue, dispatcher) = hub.spawn_dispatcher();
        let simulator = Arc::new(MatchSimulator::new(
            Arc::clone(&hub),
            queue,
            simulator_config,
        ));

        Self {
            config,
            hub,
            simulator,
            dispatcher,
        }
    }

    /// Get a reference to the broadcast hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get a reference to the match simulator
    pub fn simulator(&self) -> &Arc<MatchSimulator> {
        &self.simulator
    }

    /// The server's routes, for serving elsewhere or testing
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        routes::routes(AppState {
            hub: Arc::clone(&self.hub),
            simulator: Arc::clone(&self.simulator),
            config: self.config.clone(),
        })
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes
    ///
    /// Stops accepting connections, stops running simulations and closes
    /// every push subscriber so open SSE and WebSocket responses finish.
    /// Long-polls already in flight are still answered at their deadline.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (addr, server) =
            warp::serve(self.routes()).try_bind_ephemeral(self.config.bind_addr)?;
        tracing::info!(addr = %addr, "Score server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = server => {}
        }

        self.simulator.stop_all();
        self.hub.close_all();
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

impl Drop for ScoreServer {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
