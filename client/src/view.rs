//! Screen <-> world coordinate mapping shared by input sampling and rendering.
//!
//! The arena (`WORLD_WIDTH` x `WORLD_HEIGHT`) is fit into the window letterboxed,
//! preserving aspect ratio, and centered.

use shared::constants::{WORLD_HEIGHT, WORLD_WIDTH};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Viewport {
    pub fn fit(screen_width: f32, screen_height: f32) -> Self {
        let scale = (screen_width / WORLD_WIDTH).min(screen_height / WORLD_HEIGHT);
        let offset_x = (screen_width - WORLD_WIDTH * scale) / 2.0;
        let offset_y = (screen_height - WORLD_HEIGHT * scale) / 2.0;
        Viewport { scale, offset_x, offset_y }
    }

    pub fn world_to_screen(&self, world: (f32, f32)) -> (f32, f32) {
        (world.0 * self.scale + self.offset_x, world.1 * self.scale + self.offset_y)
    }

    pub fn screen_to_world(&self, screen: (f32, f32)) -> (f32, f32) {
        ((screen.0 - self.offset_x) / self.scale, (screen.1 - self.offset_y) / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_screen_space() {
        let viewport = Viewport::fit(800.0, 600.0);
        let world = (12.0, 30.0);
        let screen = viewport.world_to_screen(world);
        let back = viewport.screen_to_world(screen);
        assert!((back.0 - world.0).abs() < 1e-3);
        assert!((back.1 - world.1).abs() < 1e-3);
    }
}
