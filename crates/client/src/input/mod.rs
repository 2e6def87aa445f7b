// Keyboard and pointer input handling
//
// DOM listeners only push `InputEvent`s into a shared queue; the game loop drains it once
// per frame. `MovementInput` turns held arrow keys into `move`/`stop` messages.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::DVec2;
use protocol::{ClientMessage, Direction};

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(Direction),
    KeyUp(Direction),
    /// Click on the overview map, in map pixels.
    OverviewClick(DVec2),
    Resize { width: f64, height: f64 },
}

pub type InputQueue = Rc<RefCell<VecDeque<InputEvent>>>;

/// Map a `KeyboardEvent.key` value to a movement direction.
pub fn direction_from_key(key: &str) -> Option<Direction> {
    match key {
        "ArrowUp" => Some(Direction::Up),
        "ArrowDown" => Some(Direction::Down),
        "ArrowLeft" => Some(Direction::Left),
        "ArrowRight" => Some(Direction::Right),
        _ => None,
    }
}

/// Held-direction tracker.
///
/// While at least one direction is held, a `move` for the highest-priority held direction is
/// sent immediately on change and re-sent every `resend_ms`. Releasing the last direction
/// yields exactly one `stop`.
#[derive(Debug, Clone)]
pub struct MovementInput {
    held: [bool; 4],
    resend_ms: f64,
    active: Option<Direction>,
    last_sent: f64,
}

impl MovementInput {
    pub fn new(resend_ms: f64) -> Self {
        Self {
            held: [false; 4],
            resend_ms,
            active: None,
            last_sent: 0.0,
        }
    }

    /// Highest-priority held direction.
    pub fn current(&self) -> Option<Direction> {
        Direction::PRIORITY
            .into_iter()
            .find(|dir| self.held[dir.index()])
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    /// Key auto-repeat presses of an already held key are ignored.
    pub fn press(&mut self, dir: Direction, now: f64) -> Option<ClientMessage> {
        if self.held[dir.index()] {
            return None;
        }
        self.held[dir.index()] = true;
        self.retarget(now)
    }

    pub fn release(&mut self, dir: Direction, now: f64) -> Option<ClientMessage> {
        if !self.held[dir.index()] {
            return None;
        }
        self.held[dir.index()] = false;
        if self.current().is_none() {
            return self.active.take().map(|_| ClientMessage::Stop);
        }
        self.retarget(now)
    }

    /// Periodic resend while a direction is held.
    pub fn poll(&mut self, now: f64) -> Option<ClientMessage> {
        let direction = self.active?;
        if now - self.last_sent < self.resend_ms {
            return None;
        }
        self.last_sent = now;
        Some(ClientMessage::Move { direction })
    }

    /// Forget every held key without emitting anything (connection lost).
    pub fn cancel(&mut self) {
        self.held = [false; 4];
        self.active = None;
    }

    fn retarget(&mut self, now: f64) -> Option<ClientMessage> {
        let direction = self.current()?;
        if self.active == Some(direction) {
            return None;
        }
        self.active = Some(direction);
        self.last_sent = now;
        Some(ClientMessage::Move { direction })
    }
}
