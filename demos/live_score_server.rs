//! Live score server with a simulated match
//!
//! Run with: cargo run --example live_score_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example live_score_server                  # binds to 0.0.0.0:3000
//!   cargo run --example live_score_server localhost        # binds to 127.0.0.1:3000
//!   cargo run --example live_score_server 127.0.0.1:3001   # binds to 127.0.0.1:3001
//!
//! ## Start the match
//!
//!   curl -X POST localhost:3000/api/startMatch
//!
//! ## Follow it
//!
//!   curl localhost:3000/api/score
//!   curl 'localhost:3000/api/score/long?since=1'
//!   curl -N localhost:3000/api/score/sse
//!   websocat ws://localhost:3000/ws
//!
//! ## Stats
//!
//!   curl localhost:3000/api/stats

use std::net::SocketAddr;
use std::time::Duration;

use scorecast::server::DEFAULT_PORT;
use scorecast::{ScoreServer, ServerConfig};

fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: live_score_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:3000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  live_score_server                     # binds to 0.0.0.0:3000");
    eprintln!("  live_score_server localhost           # binds to 127.0.0.1:3000");
    eprintln!("  live_score_server 127.0.0.1:3001      # binds to 127.0.0.1:3001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scorecast=debug".parse()?)
                .add_directive("live_score_server=debug".parse()?),
        )
        .init();

    println!("Starting live score server on {}", config.bind_addr);
    println!();
    let port = config.bind_addr.port();
    println!("Start the match:  curl -X POST http://localhost:{}/api/startMatch", port);
    println!("Watch it:         curl -N http://localhost:{}/api/score/sse", port);
    println!();

    let server = ScoreServer::new(config);
    let hub = std::sync::Arc::clone(server.hub());

    // Periodic stats line
    let stats_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        interval.tick().await;
        loop {
            interval.tick().await;
            let stats = hub.stats();
            println!(
                "Stats: published={} delivered={} pending={} subscribers={}",
                stats.publishes,
                stats.frames_delivered,
                stats.pending_waiters,
                stats.push_subscribers,
            );
        }
    });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            server.simulator().stop_all();
        }
    }

    stats_task.abort();
    Ok(())
}
