//! Terminal prompts for proxy credentials.
//!
//! Each field is read on the blocking pool so the runtime keeps serving
//! timers while the user types. Any read failure (EOF, Ctrl-C, Esc)
//! counts as the user dismissing the prompt.

use std::io::{self, IsTerminal};

use dialoguer::Input;
use tracing::debug;

use netspeed_core::{CredentialField, CredentialPrompt};

/// Reads proxy fields from the controlling terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    /// Interactive only when prompting is allowed and stdin is a terminal.
    pub fn new(no_prompt: bool) -> Self {
        Self {
            interactive: !no_prompt && io::stdin().is_terminal(),
        }
    }
}

impl CredentialPrompt for TerminalPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn ask(&self, field: CredentialField) -> Option<String> {
        let answer = tokio::task::spawn_blocking(move || read_field(field))
            .await
            .ok()?;
        match answer {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(%field, error = %e, "prompt dismissed");
                None
            }
        }
    }
}

fn read_field(field: CredentialField) -> io::Result<String> {
    match field {
        CredentialField::Password => rpassword::prompt_password(format!("{}: ", field.label())),
        CredentialField::User | CredentialField::Host | CredentialField::Port => {
            Input::<String>::new()
                .with_prompt(field.label())
                .allow_empty(true)
                .interact_text()
                .map_err(io::Error::other)
        }
    }
}
