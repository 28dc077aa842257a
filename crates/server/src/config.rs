// crates/server/src/config.rs
//! Command-line and environment configuration.

use clap::Parser;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Where to listen. Every flag falls back to an environment variable, then
/// to its default.
#[derive(Debug, Clone, Parser)]
#[command(name = "progression", version, about = "Queue arithmetic progressions and step them one at a time")]
pub struct Config {
    /// Address to bind (IP or hostname)
    #[arg(long, env = "PROGRESSION_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "PROGRESSION_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Config {
    /// `host:port`, suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
