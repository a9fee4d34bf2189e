use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Everything the main loop reacts to. Each variant is worth a redraw;
/// clock ticks are only produced while a session is being timed.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    ClockTick,
}

/// Terminal input feeding the pump. Ticks are the pump's business, not the
/// source's.
pub trait InputSource: Send + 'static {
    /// Wait up to `timeout` for input. None means the timeout elapsed or
    /// the input thread is gone; the pump decides what that turns into.
    fn poll(&self, timeout: Duration) -> Option<AppEvent>;
}

fn poll_channel(rx: &Receiver<AppEvent>, timeout: Duration) -> Option<AppEvent> {
    match rx.recv_timeout(timeout) {
        Ok(ev) => Some(ev),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => {
            // Input thread gone; keep the caller paced instead of spinning
            thread::sleep(timeout);
            None
        }
    }
}

/// Reads crossterm events on a background thread. Key releases are dropped
/// so a press cannot act twice on platforms that report both.
pub struct CrosstermInput {
    rx: Receiver<AppEvent>,
}

impl CrosstermInput {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(AppEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(AppEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });
        Self { rx }
    }
}

impl Default for CrosstermInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for CrosstermInput {
    fn poll(&self, timeout: Duration) -> Option<AppEvent> {
        poll_channel(&self.rx, timeout)
    }
}

/// Channel-fed input for driving the loop without a terminal.
pub struct ChannelInput {
    rx: Receiver<AppEvent>,
}

impl ChannelInput {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl InputSource for ChannelInput {
    fn poll(&self, timeout: Duration) -> Option<AppEvent> {
        poll_channel(&self.rx, timeout)
    }
}

/// Hands the main loop its next event. While the session clock runs the
/// wait is capped at the tick rate and a quiet interval comes back as a
/// ClockTick; while idle the pump just waits for input in longer slices,
/// so an untouched app never redraws.
pub struct EventPump<S: InputSource> {
    input: S,
    tick_rate: Duration,
    idle_wait: Duration,
}

impl<S: InputSource> EventPump<S> {
    pub fn new(input: S, tick_rate: Duration) -> Self {
        Self {
            input,
            tick_rate,
            idle_wait: tick_rate * 4,
        }
    }

    pub fn next(&self, clock_running: bool) -> AppEvent {
        loop {
            let wait = if clock_running {
                self.tick_rate
            } else {
                self.idle_wait
            };
            match self.input.poll(wait) {
                Some(ev) => return ev,
                None if clock_running => return AppEvent::ClockTick,
                None => {}
            }
        }
    }
}
