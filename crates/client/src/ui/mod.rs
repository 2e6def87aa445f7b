// Chat transcript and its DOM panel
use std::collections::VecDeque;

use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

pub const WELCOME: &str = "Welcome to the game! Type a message to chat with other players.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub username: String,
    pub message: String,
    pub system: bool,
}

/// Bounded chat transcript. The oldest entry is dropped once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
    revision: u64,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        let mut log = Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            revision: 0,
        };
        log.push_system(WELCOME);
        log
    }

    pub fn push(&mut self, username: &str, message: &str) {
        self.insert(ChatEntry {
            username: username.to_string(),
            message: message.to_string(),
            system: false,
        });
    }

    pub fn push_system(&mut self, message: &str) {
        self.insert(ChatEntry {
            username: "system".to_string(),
            message: message.to_string(),
            system: true,
        });
    }

    fn insert(&mut self, entry: ChatEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.revision += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    /// Bumped on every change.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
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

/// Renders a `ChatLog` into the `chatMessages` element.
pub struct ChatPanel {
    container: Element,
    shown: Option<u64>,
}

impl ChatPanel {
    pub fn new(document: &Document, id: &str) -> Result<Self, JsValue> {
        let container = document
            .get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("{id} not found")))?;
        Ok(Self {
            container,
            shown: None,
        })
    }

    /// Redraw only when the log changed since the last call.
    pub fn sync(&mut self, log: &ChatLog) {
        if self.shown == Some(log.revision()) {
            return;
        }
        self.container.set_inner_html(&render_html(log));
        self.container.set_scroll_top(self.container.scroll_height());
        self.shown = Some(log.revision());
    }
}

fn render_html(log: &ChatLog) -> String {
    let mut html = String::new();
    for entry in log.entries() {
        if entry.system {
            html.push_str(&format!(
                "<div class=\"chat-message\"><span class=\"chat-system\">{}</span></div>",
                html_escape(&entry.message)
            ));
        } else {
            html.push_str(&format!(
                "<div class=\"chat-message\"><span class=\"chat-username\">{}:</span> {}</div>",
                html_escape(&entry.username),
                html_escape(&entry.message)
            ));
        }
    }
    html
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_log_has_welcome_line() {
        let log = ChatLog::new(50);
        let first = log.entries().next().unwrap();
        assert!(first.system);
        assert_eq!(first.message, WELCOME);
        assert_eq!(log.revision(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = ChatLog::new(3);
        for i in 0..5 {
            log.push("ada", &format!("m{i}"));
        }
        let messages: Vec<&str> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["m2", "m3", "m4"]);
        assert_eq!(log.revision(), 6);
    }

    #[test]
    fn test_html_is_escaped() {
        let mut log = ChatLog::new(5);
        log.push("<b>eve</b>", "a & b");
        let html = render_html(&log);
        assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;:"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("<b>"));
    }
}
