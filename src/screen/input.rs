//! Input injection: pointer clicks, wheel scrolls, key presses and hotkeys.
//!
//! The engine depends on the [`Input`] trait; [`EnigoInput`] is the
//! cross-platform implementation backed by `enigo`.

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

/// Keys the export flow needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Alt,
    Meta,
    D,
}

/// OS-level input injection.
pub trait Input: Send {
    fn click_at(&mut self, x: i32, y: i32) -> anyhow::Result<()>;
    /// Wheel scroll; positive is up, negative is down.
    fn scroll(&mut self, dy: i32) -> anyhow::Result<()>;
    fn press(&mut self, key: Key) -> anyhow::Result<()>;
    fn hotkey(&mut self, modifiers: &[Key], key: Key) -> anyhow::Result<()>;
}

pub struct EnigoInput {
    enigo: Enigo,
}

impl EnigoInput {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("failed to create input driver: {e:?}"))?;
        Ok(Self { enigo })
    }
}

fn to_enigo(key: Key) -> enigo::Key {
    match key {
        Key::Enter => enigo::Key::Return,
        Key::Escape => enigo::Key::Escape,
        Key::Tab => enigo::Key::Tab,
        Key::Alt => enigo::Key::Alt,
        Key::Meta => enigo::Key::Meta,
        Key::D => enigo::Key::Unicode('d'),
    }
}

impl Input for EnigoInput {
    fn click_at(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow::anyhow!("failed to move mouse: {e:?}"))?;
        std::thread::sleep(std::time::Duration::from_millis(50));
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| anyhow::anyhow!("failed to click: {e:?}"))
    }

    fn scroll(&mut self, dy: i32) -> anyhow::Result<()> {
        // Config distances use wheel units where positive scrolls up; enigo's
        // vertical axis is positive-down and counts lines.
        let lines = if dy.abs() < 120 { -dy.signum() } else { -dy / 120 };
        self.enigo
            .scroll(lines, Axis::Vertical)
            .map_err(|e| anyhow::anyhow!("failed to scroll: {e:?}"))
    }

    fn press(&mut self, key: Key) -> anyhow::Result<()> {
        self.enigo
            .key(to_enigo(key), Direction::Click)
            .map_err(|e| anyhow::anyhow!("failed to press key: {e:?}"))
    }

    fn hotkey(&mut self, modifiers: &[Key], key: Key) -> anyhow::Result<()> {
        for modifier in modifiers {
            self.enigo
                .key(to_enigo(*modifier), Direction::Press)
                .map_err(|e| anyhow::anyhow!("failed to hold modifier: {e:?}"))?;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        let result = self
            .enigo
            .key(to_enigo(key), Direction::Click)
            .map_err(|e| anyhow::anyhow!("failed to press key: {e:?}"));
        std::thread::sleep(std::time::Duration::from_millis(20));
        for modifier in modifiers.iter().rev() {
            self.enigo
                .key(to_enigo(*modifier), Direction::Release)
                .map_err(|e| anyhow::anyhow!("failed to release modifier: {e:?}"))?;
        }
        result
    }
}
