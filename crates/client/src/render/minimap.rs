// Overview map - scaled world summary with viewport rectangle and player markers
use std::f64::consts::TAU;

use glam::DVec2;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use super::EntityView;
use crate::viewport::Viewport;

pub const LOCAL_COLOR: &str = "#00ff00";
pub const REMOTE_COLOR: &str = "#ff0000";
const VIEWPORT_COLOR: &str = "#00ff00";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub center: DVec2,
    pub radius: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewLayout {
    /// Viewport rectangle in map pixels: x, y, width, height.
    pub viewport: [f64; 4],
    pub markers: Vec<Marker>,
}

/// Geometry of the square overview map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverviewMap {
    size: f64,
}

impl OverviewMap {
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Scale the viewport and every entity by `size / world` per axis.
    pub fn layout(&self, viewport: &Viewport, entities: &[EntityView]) -> OverviewLayout {
        let scale = DVec2::splat(self.size) / viewport.world_size();
        let origin = viewport.origin() * scale;
        let extent = viewport.size() * scale;

        let markers = entities
            .iter()
            .map(|e| {
                let (radius, color) = if e.is_local {
                    (3.0, LOCAL_COLOR)
                } else {
                    (2.0, REMOTE_COLOR)
                };
                Marker {
                    center: e.position * scale,
                    radius,
                    color,
                }
            })
            .collect();

        OverviewLayout {
            viewport: [origin.x, origin.y, extent.x, extent.y],
            markers,
        }
    }

    /// Recenter the main viewport on a map-pixel click.
    pub fn click(&self, viewport: &mut Viewport, click: DVec2) {
        let world = viewport.world_size();
        viewport.recenter_from_overview_click(click, self.size, world.x, world.y);
    }
}

/// Canvas that draws an `OverviewLayout`.
pub struct Minimap {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    map: OverviewMap,
}

impl Minimap {
    pub fn new(canvas: HtmlCanvasElement, map: OverviewMap) -> Result<Self, JsValue> {
        canvas.set_width(map.size() as u32);
        canvas.set_height(map.size() as u32);
        let ctx = canvas
            .get_context("2d")?
            .ok_or("Failed to get minimap 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx, map })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn draw(
        &self,
        viewport: &Viewport,
        entities: &[EntityView],
        background: Option<&HtmlImageElement>,
    ) {
        let size = self.map.size();
        let world = viewport.world_size();
        let layout = self.map.layout(viewport, entities);

        self.ctx.clear_rect(0.0, 0.0, size, size);
        if let Some(img) = background {
            let _ = self
                .ctx
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    img, 0.0, 0.0, world.x, world.y, 0.0, 0.0, size, size,
                );
        }

        let [x, y, w, h] = layout.viewport;
        self.ctx.set_stroke_style_str(VIEWPORT_COLOR);
        self.ctx.set_line_width(2.0);
        self.ctx.stroke_rect(x, y, w, h);

        for marker in &layout.markers {
            self.ctx.set_fill_style_str(marker.color);
            self.ctx.begin_path();
            let _ = self
                .ctx
                .arc(marker.center.x, marker.center.y, marker.radius, 0.0, TAU);
            self.ctx.fill();
        }
    }
}
