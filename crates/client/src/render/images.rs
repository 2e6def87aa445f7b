// Asynchronous image decoding with a session-scoped cache
//
// Decodes run as futures; their completions are queued and applied by `pump` on the next
// frame, so rendering only ever reads the cache. Entries are never evicted and failed
// sources are not retried.
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("could not create image element: {0}")]
    Create(String),

    #[error("image decode failed: {0}")]
    Decode(String),
}

/// A decoded image with known pixel dimensions.
pub trait Bitmap {
    fn size(&self) -> (f64, f64);
}

impl Bitmap for HtmlImageElement {
    fn size(&self) -> (f64, f64) {
        (self.natural_width() as f64, self.natural_height() as f64)
    }
}

pub type Completion<B> = (String, Result<B, ImageError>);

pub trait ImageLoader {
    type Bitmap: Bitmap;

    /// Begin decoding `src`. The result surfaces later through `drain_completed`.
    fn start(&mut self, src: &str);

    fn drain_completed(&mut self) -> Vec<Completion<Self::Bitmap>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeState<B> {
    Pending,
    Ready(B),
    Failed,
}

pub struct DecodedImageCache<L: ImageLoader> {
    loader: L,
    entries: HashMap<String, DecodeState<L::Bitmap>>,
}

impl<L: ImageLoader> DecodedImageCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
        }
    }

    /// Apply finished decodes. Returns true when any entry changed.
    pub fn pump(&mut self) -> bool {
        let completed = self.loader.drain_completed();
        let changed = !completed.is_empty();
        for (src, result) in completed {
            let state = match result {
                Ok(bitmap) => {
                    debug!("Decoded image {}", short(&src));
                    DecodeState::Ready(bitmap)
                }
                Err(e) => {
                    warn!("{} ({})", e, short(&src));
                    DecodeState::Failed
                }
            };
            self.entries.insert(src, state);
        }
        changed
    }

    /// The decoded bitmap for `src`, starting a decode on first sight.
    pub fn request(&mut self, src: &str) -> Option<&L::Bitmap> {
        if !self.entries.contains_key(src) {
            self.loader.start(src);
            self.entries.insert(src.to_string(), DecodeState::Pending);
            return None;
        }
        match self.entries.get(src) {
            Some(DecodeState::Ready(bitmap)) => Some(bitmap),
            _ => None,
        }
    }

    /// The bitmap for `src` if it is already decoded. Never starts work.
    pub fn get(&self, src: &str) -> Option<&L::Bitmap> {
        match self.entries.get(src) {
            Some(DecodeState::Ready(bitmap)) => Some(bitmap),
            _ => None,
        }
    }

    pub fn state(&self, src: &str) -> Option<&DecodeState<L::Bitmap>> {
        self.entries.get(src)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// `data:` sources can be many kilobytes; keep log lines readable.
fn short(src: &str) -> String {
    const MAX: usize = 48;
    if src.chars().count() <= MAX {
        return src.to_string();
    }
    let head: String = src.chars().take(MAX).collect();
    format!("{head}...")
}

/// Decodes through `HTMLImageElement.decode()`.
#[derive(Default)]
pub struct HtmlImageLoader {
    completed: Rc<RefCell<VecDeque<Completion<HtmlImageElement>>>>,
}

impl HtmlImageLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageLoader for HtmlImageLoader {
    type Bitmap = HtmlImageElement;

    fn start(&mut self, src: &str) {
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(e) => {
                self.completed
                    .borrow_mut()
                    .push_back((src.to_string(), Err(ImageError::Create(format!("{e:?}")))));
                return;
            }
        };
        img.set_src(src);

        let completed = self.completed.clone();
        let key = src.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match JsFuture::from(img.decode()).await {
                Ok(_) => Ok(img),
                Err(e) => Err(ImageError::Decode(format!("{e:?}"))),
            };
            completed.borrow_mut().push_back((key, result));
        });
    }

    fn drain_completed(&mut self) -> Vec<Completion<HtmlImageElement>> {
        self.completed.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FakeBitmap {
        pub width: f64,
        pub height: f64,
    }

    impl Bitmap for FakeBitmap {
        fn size(&self) -> (f64, f64) {
            (self.width, self.height)
        }
    }

    /// Records requested sources; tests complete them by hand.
    #[derive(Default)]
    pub struct FakeLoader {
        pub started: Vec<String>,
        pub ready: Vec<Completion<FakeBitmap>>,
    }

    impl FakeLoader {
        pub fn finish(&mut self, src: &str, result: Result<FakeBitmap, ImageError>) {
            self.ready.push((src.to_string(), result));
        }
    }

    impl ImageLoader for FakeLoader {
        type Bitmap = FakeBitmap;

        fn start(&mut self, src: &str) {
            self.started.push(src.to_string());
        }

        fn drain_completed(&mut self) -> Vec<Completion<FakeBitmap>> {
            std::mem::take(&mut self.ready)
        }
    }

    impl<L: ImageLoader> DecodedImageCache<L> {
        pub fn loader_mut(&mut self) -> &mut L {
            &mut self.loader
        }
    }
}
