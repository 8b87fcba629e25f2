//! Draws the arena, its GameObjects, and the chat/score overlay.
//!
//! The renderer is stateless between frames: every call to [`Renderer::render`]
//! takes a full snapshot (`render_objects`, `scores`, `chat_log`) and redraws
//! from scratch, the same way the Router hands the Window a fresh batch every
//! tick rather than a diff.

use macroquad::prelude::*;
use shared::constants::{MAX_PLAYERS, MAX_SIZE, SYSTEM_PLAYER_ID, WORLD_HEIGHT, WORLD_WIDTH};
use shared::GameObjectState;

use crate::view::Viewport;

/// Deterministic per-player display color; slot 0 (system) is always gray.
pub fn player_color(player_id: u16) -> Color {
    if player_id == SYSTEM_PLAYER_ID {
        return Color::from_rgba(136, 136, 136, 255);
    }
    let palette: [Color; 8] = [
        Color::new(0.90, 0.30, 0.30, 1.0),
        Color::new(0.30, 0.80, 0.40, 1.0),
        Color::new(0.30, 0.55, 0.95, 1.0),
        Color::new(0.95, 0.80, 0.25, 1.0),
        Color::new(0.75, 0.35, 0.90, 1.0),
        Color::new(0.25, 0.85, 0.85, 1.0),
        Color::new(0.95, 0.55, 0.20, 1.0),
        Color::new(0.60, 0.90, 0.30, 1.0),
    ];
    palette[(player_id as usize - 1) % palette.len()]
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    /// Renders one frame: arena background and border, every live
    /// GameObject, the drag preview (if any), then the chat/score overlay.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        viewport: &Viewport,
        objects: &[GameObjectState],
        local_player_id: u16,
        drag_preview: Option<((f32, f32), (f32, f32))>,
        mouse_radius: f32,
        chat_log: &[String],
        chat_input: Option<&str>,
        scores: &[i32; MAX_PLAYERS],
        status_line: &str,
    ) {
        clear_background(Color::from_rgba(18, 18, 24, 255));
        self.draw_arena_bounds(viewport);

        for obj in objects {
            self.draw_object(viewport, obj, obj.player_id == local_player_id);
        }

        if let Some((origin, cursor)) = drag_preview {
            self.draw_drag_preview(viewport, origin, cursor, mouse_radius);
        }

        self.draw_scoreboard(scores);
        self.draw_chat(chat_log, chat_input);
        draw_text(status_line, 10.0, screen_height() - 10.0, 16.0, WHITE);
    }

    fn draw_arena_bounds(&self, viewport: &Viewport) {
        let top_left = viewport.world_to_screen((0.0, 0.0));
        let bottom_right = viewport.world_to_screen((WORLD_WIDTH, WORLD_HEIGHT));
        draw_rectangle_lines(
            top_left.0,
            top_left.1,
            bottom_right.0 - top_left.0,
            bottom_right.1 - top_left.1,
            2.0,
            Color::from_rgba(90, 90, 100, 255),
        );
    }

    fn draw_object(&self, viewport: &Viewport, obj: &GameObjectState, is_local: bool) {
        let (x, y) = viewport.world_to_screen((obj.position_x, obj.position_y));
        let radius = obj.radius * viewport.scale;
        let color = player_color(obj.player_id);
        draw_circle(x, y, radius, color);
        draw_circle_lines(x, y, radius, 2.0, if is_local { WHITE } else { BLACK });
    }

    fn draw_drag_preview(&self, viewport: &Viewport, origin: (f32, f32), cursor: (f32, f32), radius: f32) {
        let (ox, oy) = viewport.world_to_screen(origin);
        let (cx, cy) = viewport.world_to_screen(cursor);
        draw_circle_lines(ox, oy, radius * viewport.scale, 1.5, YELLOW);
        draw_line(ox, oy, cx, cy, 1.5, YELLOW);
    }

    fn draw_scoreboard(&self, scores: &[i32; MAX_PLAYERS]) {
        let mut y = 10.0;
        draw_text("scores", 10.0, y, 16.0, WHITE);
        y += 16.0;
        for (id, &score) in scores.iter().enumerate() {
            if id == SYSTEM_PLAYER_ID as usize || score == 0 {
                continue;
            }
            let text = format!("player {id}: {score}");
            draw_text(&text, 10.0, y, 14.0, player_color(id as u16));
            y += 14.0;
        }
    }

    fn draw_chat(&self, chat_log: &[String], chat_input: Option<&str>) {
        let x = screen_width() - 260.0;
        let mut y = screen_height() - 20.0 - chat_log.len().min(8) as f32 * 14.0;
        for line in chat_log.iter().rev().take(8).collect::<Vec<_>>().into_iter().rev() {
            draw_text(line, x, y, 13.0, LIGHTGRAY);
            y += 14.0;
        }
        if let Some(input) = chat_input {
            draw_text(&format!("> {input}"), x, screen_height() - 4.0, 13.0, WHITE);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_slot_is_always_gray() {
        assert_eq!(player_color(SYSTEM_PLAYER_ID), Color::from_rgba(136, 136, 136, 255));
    }

    #[test]
    fn distinct_players_get_distinct_colors() {
        assert_ne!(player_color(1), player_color(2));
    }

    #[test]
    fn color_assignment_is_deterministic() {
        assert_eq!(player_color(5), player_color(5));
    }

    #[test]
    fn max_size_fits_palette_indexing_without_panicking() {
        let _ = player_color(MAX_SIZE as u16);
    }
}
