//! `run`: one or more measurement sessions.

use std::time::Duration;

use tracing::info;

use netspeed_core::{BackendFactory, Connectivity, SessionController};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output;
use crate::presenter::TerminalPresenter;
use crate::prompt::TerminalPrompt;

use super::Ui;

pub async fn handle<C, F>(
    session: &SessionController<C, F>,
    args: RunArgs,
    ui: &Ui,
) -> Result<(), CliError>
where
    C: Connectivity,
    F: BackendFactory,
{
    let prompt = TerminalPrompt::new(ui.no_prompt);
    let mut results = Vec::new();

    for run in 1..=args.count {
        let mut presenter = TerminalPresenter::new(ui.paint, ui.quiet);
        if args.count > 1 {
            presenter.set_label(format!("[{run}/{}]", args.count));
        }

        let outcome = session.start_session(&prompt, &mut presenter).await;
        info!(run, completed = outcome.is_success(), "session finished");

        match CliError::from_outcome(outcome) {
            Ok(result) => results.push(result),
            Err(err) => {
                // Keep what already succeeded before reporting the failure.
                if !results.is_empty() {
                    output::print_output(&output::render_results(ui.format, &results), ui.quiet);
                }
                return Err(err);
            }
        }

        if run < args.count && args.interval > 0 {
            tokio::time::sleep(Duration::from_secs(args.interval)).await;
        }
    }

    output::print_output(&output::render_results(ui.format, &results), ui.quiet);
    Ok(())
}
