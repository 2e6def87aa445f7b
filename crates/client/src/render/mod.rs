// Canvas rendering - world background, avatars, labels, overview map
use glam::DVec2;
use protocol::Facing;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

pub mod avatar;
pub mod images;
pub mod minimap;

use crate::game::GameClient;
use avatar::{AvatarRenderer, SpriteDraw};
use images::{DecodedImageCache, HtmlImageLoader};
use minimap::Minimap;

/// What the renderer needs to know about one player, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: String,
    pub position: DVec2,
    pub facing: Facing,
    pub animation_frame: usize,
    pub display_name: String,
    pub avatar_key: String,
    pub is_local: bool,
}

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    avatars: AvatarRenderer<HtmlImageLoader>,
    background: DecodedImageCache<HtmlImageLoader>,
    background_src: String,
    minimap: Minimap,
}

impl Renderer {
    pub fn new(
        canvas: HtmlCanvasElement,
        minimap: Minimap,
        background_src: &str,
        avatar_size: f64,
        cull_margin: f64,
    ) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let mut background = DecodedImageCache::new(HtmlImageLoader::new());
        background.request(background_src);

        Ok(Self {
            canvas,
            ctx,
            avatars: AvatarRenderer::new(HtmlImageLoader::new(), avatar_size, cull_margin),
            background,
            background_src: background_src.to_string(),
            minimap,
        })
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.canvas.width() as f64
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.canvas.height() as f64
    }

    pub fn minimap(&self) -> &Minimap {
        &self.minimap
    }

    /// Draw one frame from the client's current state.
    pub fn render(&mut self, client: &GameClient) {
        self.avatars.pump();
        self.background.pump();

        let viewport = client.viewport();
        let (w, h) = (self.width(), self.height());
        self.ctx.clear_rect(0.0, 0.0, w, h);

        let background = self.background.get(&self.background_src);
        if let Some(img) = background {
            let origin = viewport.origin();
            let _ = self
                .ctx
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    img, origin.x, origin.y, w, h, 0.0, 0.0, w, h,
                );
        }

        let entities = client.entities();
        for draw in self.avatars.plan(&entities, client.world(), viewport) {
            draw_sprite(&self.ctx, &draw);
            draw_label(&self.ctx, draw.label, draw.layout.label);
        }

        self.minimap.draw(viewport, &entities, background);
    }
}

fn draw_sprite(ctx: &CanvasRenderingContext2d, draw: &SpriteDraw<'_, HtmlImageElement>) {
    let l = &draw.layout;
    if l.mirrored {
        ctx.save();
        let _ = ctx.scale(-1.0, 1.0);
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
            draw.bitmap,
            -l.x - l.width,
            l.y,
            l.width,
            l.height,
        );
        ctx.restore();
    } else {
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
            draw.bitmap,
            l.x,
            l.y,
            l.width,
            l.height,
        );
    }
}

fn draw_label(ctx: &CanvasRenderingContext2d, text: &str, at: DVec2) {
    if text.is_empty() {
        return;
    }
    ctx.save();
    ctx.set_font("12px Arial");
    ctx.set_fill_style_str("white");
    ctx.set_stroke_style_str("black");
    ctx.set_line_width(2.0);
    ctx.set_text_align("center");
    let _ = ctx.stroke_text(text, at.x, at.y);
    let _ = ctx.fill_text(text, at.x, at.y);
    ctx.restore();
}
