//! Mouse and chat input sampling.
//!
//! The interaction model is a "slingshot" drag: the scroll wheel adjusts a
//! persistent preview radius, a left-button press records a drag origin, and
//! releasing fires an `AddGameObject` positioned at that origin with a
//! velocity pointing *back* from the release point (i.e. drag away from
//! where the object should end up). A right-button release clears
//! everything under the cursor within the same preview radius.

use macroquad::prelude::*;
use shared::constants::{MAX_CREATION_SIZE, MIN_SIZE};
use shared::RouterEvent;

use crate::view::Viewport;

pub struct InputManager {
    pub mouse_radius: f32,
    drag_origin: Option<(f32, f32)>,
}

impl InputManager {
    pub fn new() -> Self {
        InputManager {
            mouse_radius: MIN_SIZE,
            drag_origin: None,
        }
    }

    /// Samples mouse state for one frame and returns the Window-sourced
    /// intent it raised, if any. `player_id` is filled in by the Router
    /// (see `Router::stamp`), so any value works here.
    pub fn update(&mut self, viewport: &Viewport) -> Option<RouterEvent> {
        let (wheel_x, wheel_y) = mouse_wheel();
        let _ = wheel_x;
        if wheel_y != 0.0 {
            self.mouse_radius = (self.mouse_radius + 0.1 * wheel_y).clamp(MIN_SIZE, MAX_CREATION_SIZE);
        }

        let cursor_world = viewport.screen_to_world(mouse_position());

        if is_mouse_button_pressed(MouseButton::Left) {
            self.drag_origin = Some(cursor_world);
        }

        if is_mouse_button_released(MouseButton::Left) {
            if let Some(origin) = self.drag_origin.take() {
                return Some(RouterEvent::AddGameObject {
                    player_id: 0,
                    radius: self.mouse_radius,
                    position: origin,
                    velocity: (origin.0 - cursor_world.0, origin.1 - cursor_world.1),
                });
            }
        }

        if is_mouse_button_released(MouseButton::Right) {
            return Some(RouterEvent::RemoveNearMouse { position: cursor_world, pick_radius: self.mouse_radius });
        }

        None
    }

    /// Live preview of where a release would spawn an object right now, for
    /// the drag-vector overlay; `None` while no drag is in progress.
    pub fn drag_preview(&self, viewport: &Viewport) -> Option<((f32, f32), (f32, f32))> {
        let origin = self.drag_origin?;
        Some((origin, viewport.screen_to_world(mouse_position())))
    }
}

impl Default for InputManager {
    fn default() -> Self {
        InputManager::new()
    }
}

/// Tracks the chat text box: accumulated characters and whether Enter was
/// just pressed to submit the line.
pub struct ChatBox {
    pub text: String,
    pub focused: bool,
}

impl ChatBox {
    pub fn new() -> Self {
        ChatBox { text: String::new(), focused: false }
    }

    /// Samples keyboard text entry for one frame; returns the submitted
    /// line when Enter is pressed with non-empty text.
    pub fn update(&mut self) -> Option<String> {
        if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
            if !self.focused {
                self.focused = true;
                return None;
            }
            if self.text.is_empty() {
                self.focused = false;
                return None;
            }
            let submitted = std::mem::take(&mut self.text);
            self.focused = false;
            return Some(submitted);
        }

        if !self.focused {
            return None;
        }

        if is_key_pressed(KeyCode::Escape) {
            self.text.clear();
            self.focused = false;
            return None;
        }
        if is_key_pressed(KeyCode::Backspace) {
            self.text.pop();
        }
        while let Some(c) = get_char_pressed() {
            if !c.is_control() {
                self.text.push(c);
            }
        }

        None
    }
}

impl Default for ChatBox {
    fn default() -> Self {
        ChatBox::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_radius_starts_at_minimum_size() {
        assert_eq!(InputManager::new().mouse_radius, MIN_SIZE);
    }

    #[test]
    fn chat_box_starts_empty_and_unfocused() {
        let chat = ChatBox::new();
        assert!(chat.text.is_empty());
        assert!(!chat.focused);
    }
}
