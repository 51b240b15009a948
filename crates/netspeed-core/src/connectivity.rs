// ── Connectivity seam ──
//
// The resolver only needs two questions answered: "is the endpoint
// reachable directly?" and "does this candidate proxy work?". Both are
// one bounded request against the same well-known endpoint.

use std::future::Future;

use netspeed_api::{ConnectivityProbe, ProxySettings};

use crate::credentials::ProxyCredentials;
use crate::error::CoreError;

/// Reachability checks used by [`ProxyResolver`](crate::ProxyResolver).
pub trait Connectivity: Send + Sync {
    /// Endpoint description for messages and logs.
    fn endpoint(&self) -> String;

    /// `true` iff a direct request succeeded within the timeout.
    /// Never fails; every problem reads as `false`.
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;

    /// One verification request through `proxy`.
    fn verify_proxy(
        &self,
        proxy: &ProxyCredentials,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl Connectivity for ConnectivityProbe {
    fn endpoint(&self) -> String {
        ConnectivityProbe::endpoint(self).to_string()
    }

    async fn is_reachable(&self) -> bool {
        ConnectivityProbe::is_reachable(self).await
    }

    async fn verify_proxy(&self, proxy: &ProxyCredentials) -> Result<(), CoreError> {
        let settings = ProxySettings::from(proxy);
        self.check(Some(&settings)).await.map_err(CoreError::from)
    }
}
