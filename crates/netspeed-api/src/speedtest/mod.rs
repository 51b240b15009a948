// speedtest.net adapter: server list models and the measuring client.

pub mod client;
pub mod models;

pub use client::{DEFAULT_SERVERS_URL, MeasureSettings, SpeedtestClient};
pub use models::Server;
