use chrono::Utc;
use ls_engine::{ClockSource, Command, CommandOutcome, OutputSink, Session, TransportState};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::keymap::{Keyboard, KEY_VELOCITY};
use crate::save::{save_to, SaveError};

/// Inputs waiting to be handled before the inbox rejects more.
pub const INBOX_CAPACITY: usize = 256;

/// Longest the run loop sleeps before looking at the inbox again.
pub const MAX_WAIT: u64 = 1_000_000;

/// Something a front end wants done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Letter key pressed; plays a note at the keyboard octave
    KeyDown(char),
    KeyUp(char),
    OctaveUp,
    OctaveDown,
    Save,
    /// Log the status line
    ShowStatus,
}

impl From<Command> for Input {
    fn from(command: Command) -> Self {
        Input::Command(command)
    }
}

/// Sending half of the inbox, handed to the input thread.
pub struct InputSender {
    producer: HeapProd<Input>,
}

impl InputSender {
    /// Queue an input. Gives it back if the inbox is full.
    pub fn send(&mut self, input: impl Into<Input>) -> Result<(), Input> {
        self.producer.try_push(input.into())
    }
}

/// Owns a session and drives it from the wall clock and an input inbox.
pub struct Controller<C: ClockSource, O: OutputSink> {
    session: Session<C, O>,
    inbox: HeapCons<Input>,
    keyboard: Keyboard,
    output_dir: PathBuf,
    last_saved: Option<PathBuf>,
}

impl<O: OutputSink> Controller<SystemClock, O> {
    pub fn new(config: &Config, output: O) -> (Self, InputSender) {
        Self::with_clock(config, SystemClock::new(), output)
    }
}

impl<C: ClockSource, O: OutputSink> Controller<C, O> {
    pub fn with_clock(config: &Config, clock: C, output: O) -> (Self, InputSender) {
        let (producer, inbox) = HeapRb::<Input>::new(INBOX_CAPACITY).split();
        let controller = Self {
            session: Session::new(config.session, clock, output),
            inbox,
            keyboard: Keyboard::new(config.octave),
            output_dir: config.output_dir.clone(),
            last_saved: None,
        };
        (controller, InputSender { producer })
    }

    pub fn session(&self) -> &Session<C, O> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C, O> {
        &mut self.session
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn last_saved(&self) -> Option<&PathBuf> {
        self.last_saved.as_ref()
    }

    /// Apply one input now.
    pub fn handle(&mut self, input: Input) -> CommandOutcome {
        match input {
            Input::Command(command) => {
                let outcome = self.session.execute(command);
                // stop and panic both clear the session's held notes
                let silenced = match command {
                    Command::Panic | Command::Stop => true,
                    Command::ToggleClock => self.session.state() == TransportState::Stopped,
                    _ => false,
                };
                if silenced {
                    self.keyboard.reset();
                }
                if outcome != CommandOutcome::Applied {
                    log::debug!(target: "session", "{:?}: {:?}", command, outcome);
                }
                outcome
            }
            Input::KeyDown(key) => match self.keyboard.press(key) {
                Some(note) => {
                    self.session.note_on(note, KEY_VELOCITY);
                    CommandOutcome::Applied
                }
                None => CommandOutcome::Ignored,
            },
            Input::KeyUp(key) => match self.keyboard.release(key) {
                Some(note) => {
                    self.session.note_off(note);
                    CommandOutcome::Applied
                }
                None => CommandOutcome::Ignored,
            },
            Input::OctaveUp => CommandOutcome::from_flag(self.keyboard.octave_up()),
            Input::OctaveDown => CommandOutcome::from_flag(self.keyboard.octave_down()),
            Input::Save => match self.save() {
                Ok(_) => CommandOutcome::Applied,
                Err(err) => {
                    log::error!(target: "save", "{}", err);
                    CommandOutcome::Ignored
                }
            },
            Input::ShowStatus => {
                log::info!(target: "status", "{} | octave {}", self.session.status(), self.keyboard.octave());
                CommandOutcome::Applied
            }
        }
    }

    /// Handle queued input, then fire due timers. Returns inputs handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(input) = self.inbox.try_pop() {
            self.handle(input);
            handled += 1;
        }
        self.session.run_due();
        handled
    }

    /// Pump until `stop` is set, sleeping between deadlines. Stops the
    /// transport on the way out.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            self.pump();
            let now = self.session.source().now();
            let wake = self.session.next_deadline().map_or(now + MAX_WAIT, |d| d.min(now + MAX_WAIT));
            self.session.source_mut().sleep_until(wake);
        }
        self.pump();
        self.session.stop();
    }

    /// Save the track bank to the output directory under a timestamped name.
    pub fn save(&mut self) -> Result<PathBuf, SaveError> {
        let path = save_to(
            &self.output_dir,
            Utc::now(),
            self.session.tracks(),
            self.session.tempo(),
            self.session.clock().geometry(),
        )?;
        self.last_saved = Some(path.clone());
        Ok(path)
    }
}
