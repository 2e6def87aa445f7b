// Viewport - camera origin, world <-> screen transform, culling
//
// The viewport is the display-sized window into a fixed-size world. Its origin is the
// world coordinate shown at the top-left pixel and is kept inside the world:
//   0 <= origin.x <= world.x - size.x   (origin.x = 0 when the world is narrower)
// and likewise for y.
use glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    origin: DVec2,
    size: DVec2,
    world: DVec2,
}

impl Viewport {
    pub fn new(width: f64, height: f64, world_width: f64, world_height: f64) -> Self {
        Self {
            origin: DVec2::ZERO,
            size: DVec2::new(width, height),
            world: DVec2::new(world_width, world_height),
        }
    }

    #[inline]
    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    #[inline]
    pub fn size(&self) -> DVec2 {
        self.size
    }

    #[inline]
    pub fn world_size(&self) -> DVec2 {
        self.world
    }

    /// Center the display on a world point, then clamp to the world.
    pub fn recenter_on(&mut self, x: f64, y: f64) {
        self.origin = DVec2::new(x, y) - self.size / 2.0;
        self.clamp();
    }

    /// Change the display size (window resize) and re-clamp.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = DVec2::new(width, height);
        self.clamp();
    }

    /// Convert world coordinates to screen coordinates.
    #[inline]
    pub fn to_screen(&self, world: DVec2) -> DVec2 {
        world - self.origin
    }

    /// Convert screen coordinates to world coordinates.
    #[inline]
    pub fn to_world(&self, screen: DVec2) -> DVec2 {
        screen + self.origin
    }

    /// True when the point lands on the display, allowing `margin` pixels of slack.
    pub fn is_visible(&self, world: DVec2, margin: f64) -> bool {
        let screen = self.to_screen(world);
        screen.x >= -margin
            && screen.x <= self.size.x + margin
            && screen.y >= -margin
            && screen.y <= self.size.y + margin
    }

    /// Map a click on a `map_size` square overview to world space and center there.
    pub fn recenter_from_overview_click(
        &mut self,
        click: DVec2,
        map_size: f64,
        world_width: f64,
        world_height: f64,
    ) {
        let x = click.x / map_size * world_width;
        let y = click.y / map_size * world_height;
        self.recenter_on(x, y);
    }

    // `f64::clamp` panics when min > max, which happens for worlds smaller than the display.
    fn clamp(&mut self) {
        let max = self.world - self.size;
        self.origin.x = self.origin.x.min(max.x).max(0.0);
        self.origin.y = self.origin.y.min(max.y).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_bounds(vp: &Viewport) -> bool {
        let max = vp.world_size() - vp.size();
        vp.origin().x >= 0.0 && vp.origin().x <= max.x && vp.origin().y >= 0.0 && vp.origin().y <= max.y
    }

    #[test]
    fn test_recenter_inside_world() {
        let mut vp = Viewport::new(800.0, 600.0, 2048.0, 2048.0);
        vp.recenter_on(1000.0, 1000.0);
        assert_eq!(vp.origin(), DVec2::new(600.0, 700.0));
    }

    #[test]
    fn test_recenter_clamps_to_bounds() {
        let worlds = [(2048.0, 2048.0), (800.0, 600.0), (5000.0, 900.0)];
        let targets = [(-500.0, -500.0), (0.0, 0.0), (1e6, 1e6), (400.0, 4000.0), (2047.0, 1.0)];
        for (ww, wh) in worlds {
            for (x, y) in targets {
                let mut vp = Viewport::new(800.0, 600.0, ww, wh);
                vp.recenter_on(x, y);
                assert!(in_bounds(&vp), "world {ww}x{wh} target {x},{y} -> {:?}", vp.origin());
            }
        }
    }

    #[test]
    fn test_small_world_pins_origin_to_zero() {
        let mut vp = Viewport::new(800.0, 600.0, 400.0, 300.0);
        vp.recenter_on(200.0, 150.0);
        assert_eq!(vp.origin(), DVec2::ZERO);
    }

    #[test]
    fn test_screen_round_trip() {
        let mut vp = Viewport::new(800.0, 600.0, 2048.0, 2048.0);
        vp.recenter_on(1234.5, 777.25);
        let world = DVec2::new(1300.75, 812.5);
        let screen = vp.to_screen(world);
        assert_eq!(screen + vp.origin(), world);
        assert_eq!(vp.to_world(screen), world);
    }

    #[test]
    fn test_visibility_margin() {
        let vp = Viewport::new(800.0, 600.0, 2048.0, 2048.0);
        assert!(vp.is_visible(DVec2::new(0.0, 0.0), 0.0));
        assert!(vp.is_visible(DVec2::new(-50.0, 650.0), 50.0));
        assert!(!vp.is_visible(DVec2::new(-50.1, 300.0), 50.0));
        assert!(!vp.is_visible(DVec2::new(400.0, 650.5), 50.0));
        assert!(vp.is_visible(DVec2::new(850.0, 300.0), 50.0));
    }

    #[test]
    fn test_overview_click_maps_linearly() {
        let mut vp = Viewport::new(800.0, 600.0, 2048.0, 2048.0);
        // 100px on a 200px map is the middle of the world.
        vp.recenter_from_overview_click(DVec2::new(100.0, 100.0), 200.0, 2048.0, 2048.0);
        assert_eq!(vp.origin(), DVec2::new(1024.0 - 400.0, 1024.0 - 300.0));
        // The corner clamps.
        vp.recenter_from_overview_click(DVec2::new(200.0, 200.0), 200.0, 2048.0, 2048.0);
        assert_eq!(vp.origin(), DVec2::new(2048.0 - 800.0, 2048.0 - 600.0));
    }

    #[test]
    fn test_resize_reclamps() {
        let mut vp = Viewport::new(800.0, 600.0, 2048.0, 2048.0);
        vp.recenter_on(2048.0, 2048.0);
        vp.resize(1600.0, 1200.0);
        assert_eq!(vp.origin(), DVec2::new(448.0, 848.0));
        assert!(in_bounds(&vp));
    }
}
