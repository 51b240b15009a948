//! Command dispatch: bridges CLI args -> session controller -> output.

pub mod check;
pub mod config_cmd;
pub mod run;

use netspeed_core::{BackendFactory, Connectivity, SessionController};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Painter};

/// Presentation settings shared by every handler.
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    pub format: OutputFormat,
    pub paint: Painter,
    pub quiet: bool,
    pub no_prompt: bool,
}

impl Ui {
    pub fn new(global: &GlobalOpts, cfg: &Config) -> Self {
        Self {
            format: config::output_format(global, cfg),
            paint: Painter::new(output::should_color(config::color_mode(global, cfg))),
            quiet: global.quiet,
            no_prompt: global.no_prompt,
        }
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch<C, F>(
    cmd: Command,
    session: &SessionController<C, F>,
    ui: &Ui,
) -> Result<(), CliError>
where
    C: Connectivity,
    F: BackendFactory,
{
    match cmd {
        Command::Run(args) => run::handle(session, args, ui).await,
        Command::Check => check::handle(session, ui).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
