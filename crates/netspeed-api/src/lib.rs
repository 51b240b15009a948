// netspeed-api: HTTP plumbing for the netspeed workspace.
//
// Owns everything that touches the wire: the shared transport builder
// (timeouts, user agent, explicit proxy), the single-request reachability
// probe, and a thin adapter to the public speedtest.net server network.

pub mod connectivity;
pub mod error;
pub mod speedtest;
pub mod transport;

pub use connectivity::ConnectivityProbe;
pub use error::Error;
pub use speedtest::{MeasureSettings, Server, SpeedtestClient};
pub use transport::{ProxySettings, TransportConfig};
