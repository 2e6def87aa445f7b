// WASM client entry point for world-viewer
// Wires browser events into the client queues and drives the animation loop.

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec2;
use wasm_bindgen::prelude::*;
use web_sys::{
    window, HtmlButtonElement, HtmlCanvasElement, HtmlInputElement, KeyboardEvent, MouseEvent,
};

pub mod config; // Tunables and their defaults
pub mod game; // Client context and frame update
pub mod input; // Keyboard/pointer queue, held-direction movement
pub mod interpolation; // Smoothed shadow positions
pub mod network; // Transport seam, WebSocket, reconnect policy
pub mod render; // Canvas, sprites, overview map
pub mod ui; // Chat transcript and panel
pub mod utils; // LERP, timing, logging
pub mod viewport; // World <-> screen transform
pub mod world; // Mirrored players and avatars

pub use config::ClientConfig;
pub use game::GameClient;

use input::{InputEvent, direction_from_key};
use network::WebSocketConnector;
use render::Renderer;
use render::minimap::{Minimap, OverviewMap};
use ui::ChatPanel;

/// Initialize panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

struct App {
    client: GameClient,
    renderer: Renderer,
    chat_panel: Option<ChatPanel>,
}

#[wasm_bindgen]
pub struct GameClientWrapper {
    app: Rc<RefCell<App>>,
}

#[wasm_bindgen]
impl GameClientWrapper {
    /// Create the client, open the connection and start rendering.
    ///
    /// `config` is a plain object with any `ClientConfig` fields; missing ones use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, minimap_id: &str, config: JsValue) -> Result<GameClientWrapper, JsValue> {
        init();

        let config = ClientConfig::from_js(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        utils::init_logging(&config.log_level);

        let window = window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;

        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("{canvas_id} not found")))?
            .dyn_into::<HtmlCanvasElement>()?;
        let (width, height) = window_size();
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);

        let minimap_canvas = document
            .get_element_by_id(minimap_id)
            .ok_or_else(|| JsValue::from_str(&format!("{minimap_id} not found")))?
            .dyn_into::<HtmlCanvasElement>()?;
        let minimap = Minimap::new(minimap_canvas, OverviewMap::new(config.minimap_size))?;

        let renderer = Renderer::new(
            canvas.clone(),
            minimap,
            &config.world_image,
            config.avatar_size,
            config.cull_margin,
        )?;

        // The chat panel is optional; pages without one still get a working viewer.
        let chat_panel = ChatPanel::new(&document, "chatMessages").ok();

        let mut client = GameClient::new(config, Box::new(WebSocketConnector), width, height);
        client.start(utils::now());

        let app = Rc::new(RefCell::new(App {
            client,
            renderer,
            chat_panel,
        }));

        setup_update_loop(app.clone())?;
        setup_animation_loop(app.clone())?;
        setup_input_handlers(app.clone())?;
        setup_minimap_handler(app.clone())?;
        setup_chat_handlers(app.clone())?;
        setup_resize_handler(app.clone(), canvas)?;

        tracing::info!("Viewer started");
        Ok(GameClientWrapper { app })
    }

    /// (Re-)join the world under `username`.
    pub fn join(&self, username: &str) {
        self.app.borrow_mut().client.join(username);
    }

    /// Send a chat message to the server
    pub fn send_chat(&self, message: &str) -> bool {
        self.app.borrow_mut().client.send_chat(message)
    }

    pub fn is_connected(&self) -> bool {
        self.app.borrow().client.is_connected()
    }

    pub fn player_count(&self) -> usize {
        self.app.borrow().client.player_count()
    }

    /// Reason of the last rejected join, if any.
    pub fn join_error(&self) -> Option<String> {
        self.app.borrow().client.join_error().map(str::to_string)
    }
}

fn window_size() -> (f64, f64) {
    let Some(win) = window() else {
        return (800.0, 600.0);
    };
    let width = win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let height = win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    (width, height)
}

/// Advance the client on a timer so the network drain, reconnects and movement resends
/// keep running while rendering is paused (hidden tabs stop requestAnimationFrame).
fn setup_update_loop(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;
    let interval = app.borrow().client.config().update_interval_ms.round().max(1.0) as i32;

    let closure = Closure::wrap(Box::new(move || {
        // A busy app (re-entrant JS callback) just waits for the next tick.
        if let Ok(mut app) = app.try_borrow_mut() {
            app.client.update(utils::now());
        }
    }) as Box<dyn FnMut()>);

    window.set_interval_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        interval,
    )?;
    closure.forget();

    Ok(())
}

fn setup_animation_loop(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;

    let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        {
            let mut app = app.borrow_mut();
            let App {
                client,
                renderer,
                chat_panel,
            } = &mut *app;
            renderer.render(client);
            if let Some(panel) = chat_panel {
                panel.sync(client.chat());
            }
        }

        if let (Some(win), Some(callback)) = (web_sys::window(), f.borrow().as_ref()) {
            win.request_animation_frame(callback.as_ref().unchecked_ref()).ok();
        }
    }) as Box<dyn FnMut()>));

    if let Some(callback) = g.borrow().as_ref() {
        window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    }

    Ok(())
}

/// Returns true when a text input element has focus.
/// Used to suppress movement keys while the user is typing.
fn is_text_input_focused() -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.active_element())
        .map(|el| el.tag_name().eq_ignore_ascii_case("INPUT"))
        .unwrap_or(false)
}

fn setup_input_handlers(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let queue = app.borrow().client.input_queue();

    // Keydown handler
    {
        let queue = queue.clone();
        let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if is_text_input_focused() {
                return;
            }
            if let Some(dir) = direction_from_key(&event.key()) {
                event.prevent_default();
                queue.borrow_mut().push_back(InputEvent::KeyDown(dir));
            }
        }) as Box<dyn FnMut(_)>);

        document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Keyup handler. Releases are honored even while typing so keys never stick.
    {
        let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if let Some(dir) = direction_from_key(&event.key()) {
                queue.borrow_mut().push_back(InputEvent::KeyUp(dir));
            }
        }) as Box<dyn FnMut(_)>);

        document.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

fn setup_minimap_handler(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let (queue, canvas) = {
        let app = app.borrow();
        (app.client.input_queue(), app.renderer.minimap().canvas().clone())
    };

    let closure = Closure::wrap(Box::new(move |event: MouseEvent| {
        let at = DVec2::new(event.offset_x() as f64, event.offset_y() as f64);
        queue.borrow_mut().push_back(InputEvent::OverviewClick(at));
    }) as Box<dyn FnMut(_)>);

    canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();

    Ok(())
}

fn setup_chat_handlers(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let Some(chat_input) = document.get_element_by_id("chatInput") else {
        return Ok(());
    };
    let chat_input = chat_input.dyn_into::<HtmlInputElement>()?;

    // Enter sends
    {
        let app = app.clone();
        let input = chat_input.clone();
        let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if event.key() == "Enter" {
                event.prevent_default();
                app.borrow_mut().client.send_chat(&input.value());
                input.set_value("");
            }
        }) as Box<dyn FnMut(_)>);

        chat_input.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Send button click
    if let Some(button) = document.get_element_by_id("chatSend") {
        let button = button.dyn_into::<HtmlButtonElement>()?;
        let closure = Closure::wrap(Box::new(move |_| {
            app.borrow_mut().client.send_chat(&chat_input.value());
            chat_input.set_value("");
        }) as Box<dyn FnMut(JsValue)>);

        button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

/// Resize the canvas with the window and let the viewport re-clamp.
fn setup_resize_handler(app: Rc<RefCell<App>>, canvas: HtmlCanvasElement) -> Result<(), JsValue> {
    let win = window().ok_or("No window")?;
    let queue = app.borrow().client.input_queue();

    let closure = Closure::wrap(Box::new(move || {
        let (width, height) = window_size();
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
        queue
            .borrow_mut()
            .push_back(InputEvent::Resize { width, height });
    }) as Box<dyn FnMut()>);

    win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    closure.forget();

    Ok(())
}
