//! `check`: reachability report without measuring.

use netspeed_core::{BackendFactory, Connectivity, SessionController};

use crate::error::CliError;
use crate::output;

use super::Ui;

pub async fn handle<C, F>(session: &SessionController<C, F>, ui: &Ui) -> Result<(), CliError>
where
    C: Connectivity,
    F: BackendFactory,
{
    let report = session.check_connectivity().await;
    output::print_output(&output::render_report(ui.format, &report, ui.paint), ui.quiet);

    if report.direct {
        return Ok(());
    }
    match report.proxy {
        Some(proxy) if proxy.ok => Ok(()),
        Some(proxy) => Err(CliError::ProxyAuthFailed {
            endpoint: proxy.endpoint,
            reason: proxy.error.unwrap_or_default(),
        }),
        None => Err(CliError::Unreachable),
    }
}
