// Browser WebSocket transport
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use super::{Connector, EventQueue, NetEvent, NetEventKind, Transport, TransportError};

#[derive(Debug, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(
        &mut self,
        url: &str,
        generation: u64,
        events: EventQueue,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let ws = WebSocket::new(url).map_err(|e| TransportError::Open {
            url: url.to_string(),
            reason: format!("{e:?}"),
        })?;

        let open_queue = events.clone();
        let onopen = Closure::wrap(Box::new(move |_event: JsValue| {
            open_queue.borrow_mut().push_back(NetEvent {
                generation,
                kind: NetEventKind::Opened,
            });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        let message_queue = events.clone();
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            match event.data().as_string() {
                Some(text) => message_queue.borrow_mut().push_back(NetEvent {
                    generation,
                    kind: NetEventKind::Frame(text),
                }),
                None => tracing::warn!("Discarding binary frame"),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        // The browser always follows an error with a close event.
        let onerror = Closure::wrap(Box::new(move |e: JsValue| {
            tracing::error!("WebSocket error: {:?}", e);
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let close_queue = events;
        let onclose = Closure::wrap(Box::new(move |event: CloseEvent| {
            close_queue.borrow_mut().push_back(NetEvent {
                generation,
                kind: NetEventKind::Closed { code: event.code() },
            });
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        Ok(Box::new(WebSocketTransport {
            ws,
            _onopen: onopen,
            _onmessage: onmessage,
            _onerror: onerror,
            _onclose: onclose,
        }))
    }
}

/// Owns the socket and its callbacks; dropping it detaches the handlers and closes.
pub struct WebSocketTransport {
    ws: WebSocket,
    _onopen: Closure<dyn FnMut(JsValue)>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onerror: Closure<dyn FnMut(JsValue)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
}

impl Transport for WebSocketTransport {
    fn send_text(&self, frame: &str) -> Result<(), TransportError> {
        if self.ws.ready_state() != WebSocket::OPEN {
            return Err(TransportError::NotOpen);
        }
        self.ws
            .send_with_str(frame)
            .map_err(|e| TransportError::Send(format!("{e:?}")))
    }

    fn close(&self) {
        let _ = self.ws.close();
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        let _ = self.ws.close();
    }
}
