// Avatar sprite selection and composition
use glam::DVec2;
use protocol::{AvatarDef, Facing};

use super::EntityView;
use super::images::{Bitmap, DecodedImageCache, ImageLoader};
use crate::viewport::Viewport;
use crate::world::WorldState;

/// Gap between the top of the sprite and the label baseline.
const LABEL_GAP: f64 = 5.0;

/// Pick the frame payload for a facing, falling back to south, then to the first
/// declared facing. The frame index is kept across fallbacks.
pub fn resolve_frame(avatar: &AvatarDef, facing: Facing, frame: usize) -> Option<&str> {
    avatar
        .frames
        .get(facing)
        .and_then(|row| frame_at(row, frame))
        .or_else(|| avatar.frames.get(Facing::South).and_then(|row| frame_at(row, frame)))
        .or_else(|| avatar.frames.first().and_then(|(_, row)| frame_at(row, frame)))
}

#[inline]
fn frame_at(row: &[String], frame: usize) -> Option<&str> {
    row.get(frame).map(String::as_str)
}

/// Screen-space placement of one sprite and its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteLayout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub mirrored: bool,
    pub label: DVec2,
}

impl SpriteLayout {
    /// Fixed width, height from the source aspect ratio, centered horizontally and
    /// bottom-aligned on `screen`. Degenerate bitmaps yield None.
    pub fn compose(screen: DVec2, bitmap: (f64, f64), target: f64, facing: Facing) -> Option<Self> {
        let (w, h) = bitmap;
        if !(w > 0.0 && h > 0.0) {
            return None;
        }
        let aspect = w / h;
        let width = target;
        let height = target / aspect;
        Some(Self {
            x: screen.x - width / 2.0,
            y: screen.y - height,
            width,
            height,
            mirrored: facing == Facing::West,
            label: DVec2::new(screen.x, screen.y - height - LABEL_GAP),
        })
    }
}

pub struct SpriteDraw<'a, B> {
    pub bitmap: &'a B,
    pub layout: SpriteLayout,
    pub label: &'a str,
}

pub struct AvatarRenderer<L: ImageLoader> {
    cache: DecodedImageCache<L>,
    target_size: f64,
    cull_margin: f64,
}

impl<L: ImageLoader> AvatarRenderer<L> {
    pub fn new(loader: L, target_size: f64, cull_margin: f64) -> Self {
        Self {
            cache: DecodedImageCache::new(loader),
            target_size,
            cull_margin,
        }
    }

    /// Apply finished decodes; true when something new can be drawn.
    pub fn pump(&mut self) -> bool {
        self.cache.pump()
    }

    /// Resolve, request and lay out every visible entity that has a decoded sprite.
    ///
    /// Culling happens before any image work, so off-screen entities never start a decode.
    pub fn plan<'a>(
        &'a mut self,
        entities: &'a [EntityView],
        world: &WorldState,
        viewport: &Viewport,
    ) -> Vec<SpriteDraw<'a, L::Bitmap>> {
        let visible: Vec<(&EntityView, String)> = entities
            .iter()
            .filter(|e| viewport.is_visible(e.position, self.cull_margin))
            .filter_map(|e| {
                let avatar = world.avatar(&e.avatar_key)?;
                let src = resolve_frame(avatar, e.facing, e.animation_frame)?;
                Some((e, src.to_string()))
            })
            .collect();

        for (_, src) in &visible {
            self.cache.request(src);
        }

        let cache = &self.cache;
        let target = self.target_size;
        visible
            .into_iter()
            .filter_map(|(entity, src)| {
                let bitmap = cache.get(&src)?;
                let screen = viewport.to_screen(entity.position);
                let layout = SpriteLayout::compose(screen, bitmap.size(), target, entity.facing)?;
                Some(SpriteDraw {
                    bitmap,
                    layout,
                    label: entity.display_name.as_str(),
                })
            })
            .collect()
    }

    pub fn cache(&self) -> &DecodedImageCache<L> {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn cache_mut(&mut self) -> &mut DecodedImageCache<L> {
        &mut self.cache
    }
}
