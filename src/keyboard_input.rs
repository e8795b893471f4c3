use crate::error::Result;
use crate::exercise::ExerciseKind;
use crate::pipeline::PipelineCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Select(ExerciseKind),
    Quit,
}

/// Keys 1-4 pick an exercise in catalogue order, `q`/Esc quits
pub fn action_for_key(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            ExerciseKind::ALL.get(index).copied().map(KeyAction::Select)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Keyboard control for interactive replay sessions
pub struct KeyboardInputHandler {
    commands: mpsc::Sender<PipelineCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// Send exercise switches on `commands`; quitting cancels `cancellation_token`
    pub fn new(
        commands: mpsc::Sender<PipelineCommand>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            commands,
            cancellation_token,
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input - press 1-4 to switch exercise, q to quit");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        // crossterm polling blocks, keep it off the runtime threads
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        match action_for_key(key_event.code) {
                            Some(KeyAction::Select(kind)) => {
                                info!("Switching exercise to {}", kind.display_name());
                                if commands
                                    .blocking_send(PipelineCommand::SelectExercise(kind))
                                    .is_err()
                                {
                                    warn!("Session task is gone, stopping keyboard input");
                                    break;
                                }
                            }
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                cancellation_token.cancel();
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the polling loop a chance to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
