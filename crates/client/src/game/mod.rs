// Client context - owns every component and advances them once per update tick
//
// Nothing in here touches browser APIs: time is passed in, network and input arrive through
// queues, and the transport is reached through the `Connector` seam. That keeps the whole
// client logic testable natively.
use std::rc::Rc;

use glam::DVec2;
use protocol::{ClientMessage, JoinAccepted, ServerMessage};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::input::{InputEvent, InputQueue, MovementInput};
use crate::interpolation::Interpolator;
use crate::network::{Connection, ConnectionState, Connector, EventQueue, NetEventKind};
use crate::render::EntityView;
use crate::render::minimap::OverviewMap;
use crate::ui::ChatLog;
use crate::viewport::Viewport;
use crate::world::{WorldChange, WorldState};

pub struct GameClient {
    config: ClientConfig,
    connection: Connection,
    connector: Box<dyn Connector>,
    net_events: EventQueue,
    input_events: InputQueue,
    world: WorldState,
    interpolator: Interpolator,
    viewport: Viewport,
    overview: OverviewMap,
    movement: MovementInput,
    chat: ChatLog,
    username: String,
    awaiting_join: bool,
    join_error: Option<String>,
}

impl GameClient {
    pub fn new(config: ClientConfig, connector: Box<dyn Connector>, width: f64, height: f64) -> Self {
        Self {
            connection: Connection::new(&config.server_url, config.reconnect_delay_ms),
            connector,
            net_events: EventQueue::default(),
            input_events: InputQueue::default(),
            world: WorldState::new(),
            interpolator: Interpolator::new(config.interpolation_alpha),
            viewport: Viewport::new(width, height, config.world_width, config.world_height),
            overview: OverviewMap::new(config.minimap_size),
            movement: MovementInput::new(config.move_resend_ms),
            chat: ChatLog::new(config.max_chat_messages),
            username: config.username.clone(),
            awaiting_join: false,
            join_error: None,
            config,
        }
    }

    /// Open the first connection.
    pub fn start(&mut self, now: f64) {
        self.connection
            .open(self.connector.as_mut(), &self.net_events, now);
    }

    /// Advance one tick: network, input, timers, interpolation.
    ///
    /// Driven by a timer, never by rendering.
    pub fn update(&mut self, now: f64) {
        self.process_network(now);
        self.process_input(now);

        if self.connection.poll_reconnect(now) {
            self.connection
                .open(self.connector.as_mut(), &self.net_events, now);
        }

        if self.connection.is_connected() {
            if let Some(message) = self.movement.poll(now) {
                self.connection.send(&message);
            }
        }

        self.interpolator.tick(&self.world);
    }

    fn process_network(&mut self, now: f64) {
        // Drain first so handlers are free to touch the queue owner.
        let events: Vec<_> = self.net_events.borrow_mut().drain(..).collect();
        for event in events {
            match event.kind {
                NetEventKind::Opened => {
                    if self.connection.handle_open(event.generation) {
                        self.send_join();
                    }
                }
                NetEventKind::Frame(frame) => {
                    if event.generation == self.connection.generation() {
                        self.handle_frame(&frame);
                    }
                }
                NetEventKind::Closed { code } => {
                    if self.connection.handle_close(event.generation, now) {
                        debug!("Close code {code}");
                        self.movement.cancel();
                        self.awaiting_join = false;
                    }
                }
            }
        }
    }

    fn process_input(&mut self, now: f64) {
        let events: Vec<_> = self.input_events.borrow_mut().drain(..).collect();
        for event in events {
            match event {
                InputEvent::KeyDown(dir) => {
                    if !self.connection.is_connected() {
                        continue;
                    }
                    if let Some(message) = self.movement.press(dir, now) {
                        self.connection.send(&message);
                    }
                }
                InputEvent::KeyUp(dir) => {
                    if let Some(message) = self.movement.release(dir, now) {
                        self.connection.send(&message);
                    }
                }
                InputEvent::OverviewClick(at) => self.overview.click(&mut self.viewport, at),
                InputEvent::Resize { width, height } => self.viewport.resize(width, height),
            }
        }
    }

    /// Apply one inbound text frame. Malformed frames are dropped without side effects.
    pub fn handle_frame(&mut self, frame: &str) {
        let Some(message) = Connection::decode(frame) else {
            return;
        };
        debug!("Received {}", message.action());

        match message {
            ServerMessage::JoinGame(response) => {
                if !self.awaiting_join {
                    debug!("Ignoring unsolicited join response");
                    return;
                }
                self.awaiting_join = false;
                match response.into_result() {
                    Ok(JoinAccepted {
                        player_id,
                        players,
                        avatars,
                    }) => {
                        info!("Joined as {player_id} with {} players", players.len());
                        self.join_error = None;
                        self.world.apply_join_result(player_id, players, avatars);
                    }
                    Err(e) => {
                        warn!("Join failed: {e}");
                        self.join_error = Some(e);
                    }
                }
            }
            ServerMessage::PlayerJoined { player, avatar } => {
                self.world.apply_player_joined(player, avatar);
            }
            ServerMessage::PlayersMoved { players } => {
                self.world.apply_players_moved(&players);
            }
            ServerMessage::PlayerLeft { player_id } => {
                self.world.apply_player_left(&player_id);
            }
            ServerMessage::Chat { username, message } => {
                if !username.is_empty() && !message.is_empty() {
                    self.chat.push(&username, &message);
                }
            }
            ServerMessage::Failure {
                failed_action,
                error,
            } => {
                warn!(
                    "Server error for {}: {}",
                    failed_action.as_deref().unwrap_or("unknown"),
                    error.as_deref().unwrap_or("no reason given")
                );
            }
        }

        self.apply_changes();
    }

    fn apply_changes(&mut self) {
        for change in self.world.take_changes() {
            match change {
                WorldChange::Reset => {
                    self.interpolator.clear();
                    self.recenter_on_local();
                }
                WorldChange::PlayerJoined(id) => {
                    // Re-joins teleport rather than glide.
                    self.interpolator.forget(&id);
                    if self.world.is_local(&id) {
                        self.recenter_on_local();
                    }
                }
                WorldChange::PlayersMoved { local } => {
                    if local {
                        self.recenter_on_local();
                    }
                }
                WorldChange::PlayerLeft(_) => {}
            }
        }
    }

    fn recenter_on_local(&mut self) {
        if let Some(me) = self.world.local_player() {
            self.viewport.recenter_on(me.x, me.y);
        }
    }

    fn send_join(&mut self) {
        let message = ClientMessage::JoinGame {
            username: self.username.clone(),
        };
        self.awaiting_join = self.connection.send(&message);
    }

    /// Request to (re-)enter the world under `username`.
    pub fn join(&mut self, username: &str) {
        let username = username.trim();
        if !username.is_empty() {
            self.username = username.to_string();
        }
        self.join_error = None;
        if self.connection.is_connected() {
            self.send_join();
        }
    }

    /// Send a chat line. Blank text or a closed connection drops it.
    pub fn send_chat(&mut self, text: &str) -> bool {
        let message = text.trim();
        if message.is_empty() {
            return false;
        }
        self.connection.send(&ClientMessage::Chat {
            message: message.to_string(),
        })
    }

    /// Players in draw order: by y, then by id.
    ///
    /// Positions are the smoothed shadows when `smooth_movement` is on.
    pub fn entities(&self) -> Vec<EntityView> {
        let mut entities: Vec<EntityView> = self
            .world
            .players()
            .map(|p| {
                let position = match self.interpolator.shadow(&p.id) {
                    Some(shadow) if self.config.smooth_movement => shadow.position,
                    _ => p.position(),
                };
                EntityView {
                    id: p.id.clone(),
                    position,
                    facing: p.facing,
                    animation_frame: p.animation_frame,
                    display_name: p.display_name.clone(),
                    avatar_key: p.avatar_key.clone(),
                    is_local: self.world.is_local(&p.id),
                }
            })
            .collect();
        entities.sort_by(|a, b| {
            a.position
                .y
                .total_cmp(&b.position.y)
                .then_with(|| a.id.cmp(&b.id))
        });
        entities
    }

    pub(crate) fn input_queue(&self) -> InputQueue {
        Rc::clone(&self.input_events)
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[inline]
    pub fn overview(&self) -> &OverviewMap {
        &self.overview
    }

    #[inline]
    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    #[inline]
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.world.len()
    }

    pub fn join_error(&self) -> Option<&str> {
        self.join_error.as_deref()
    }

    /// Current local player position, if joined.
    pub fn local_position(&self) -> Option<DVec2> {
        self.world.local_player().map(|p| p.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetEvent;
    use crate::network::fake::{FakeConnector, SharedWire};
    use protocol::Direction;

    const JOIN_OK: &str = r#"{
        "action": "join_game",
        "success": true,
        "playerId": "me",
        "players": {
            "me": {"id": "me", "username": "Ron", "avatar": "knight", "x": 1000, "y": 1000, "facing": "south"},
            "bob": {"id": "bob", "username": "Bob", "avatar": "knight", "x": 900, "y": 950, "facing": "west"}
        },
        "avatars": {"knight": {"name": "knight", "frames": {"south": ["s0.png"]}}}
    }"#;

    fn push(client: &GameClient, kind: NetEventKind) {
        let generation = client.connection.generation();
        client
            .net_events
            .borrow_mut()
            .push_back(NetEvent { generation, kind });
    }

    fn connected() -> (GameClient, SharedWire) {
        let connector = FakeConnector::default();
        let wire = connector.wire.clone();
        let mut client = GameClient::new(ClientConfig::default(), Box::new(connector), 800.0, 600.0);
        client.start(0.0);
        push(&client, NetEventKind::Opened);
        client.update(0.0);
        (client, wire)
    }

    fn joined() -> (GameClient, SharedWire) {
        let (mut client, wire) = connected();
        push(&client, NetEventKind::Frame(JOIN_OK.to_string()));
        client.update(0.0);
        wire.borrow_mut().sent.clear();
        (client, wire)
    }

    fn sent(wire: &SharedWire) -> Vec<ClientMessage> {
        wire.borrow()
            .sent
            .iter()
            .map(|frame| ClientMessage::decode(frame).unwrap())
            .collect()
    }

    #[test]
    fn test_open_sends_join() {
        let (client, wire) = connected();
        assert!(client.is_connected());
        assert_eq!(
            sent(&wire),
            vec![ClientMessage::JoinGame { username: "Ron".into() }]
        );
    }

    #[test]
    fn test_join_recenters_on_local_player() {
        let (client, _) = joined();
        assert_eq!(client.player_count(), 2);
        assert_eq!(client.world().local_id(), Some("me"));
        assert_eq!(client.viewport().origin(), DVec2::new(600.0, 700.0));
        assert_eq!(client.join_error(), None);
    }

    #[test]
    fn test_unsolicited_join_response_is_ignored() {
        let (mut client, _) = joined();
        let other = JOIN_OK.replace("\"playerId\": \"me\"", "\"playerId\": \"bob\"");
        client.handle_frame(&other);
        assert_eq!(client.world().local_id(), Some("me"));
    }

    #[test]
    fn test_join_failure_surfaces_error() {
        let (mut client, _) = connected();
        client.handle_frame(r#"{"action":"join_game","success":false,"error":"server full"}"#);
        assert_eq!(client.join_error(), Some("server full"));
        assert!(client.world().is_empty());

        // Joining again clears the error and sends a new request.
        client.join("Ada");
        assert_eq!(client.join_error(), None);
        client.handle_frame(JOIN_OK);
        assert_eq!(client.player_count(), 2);
    }

    #[test]
    fn test_join_rejection_with_null_body_surfaces_error() {
        let (mut client, _) = connected();
        client.handle_frame(r#"{"action":"join_game","success":false,"error":"taken","players":null}"#);
        assert_eq!(client.join_error(), Some("taken"));

        // No join is outstanding anymore, so a stray acceptance is not applied.
        client.handle_frame(JOIN_OK);
        assert!(client.world().is_empty());
    }

    #[test]
    fn test_local_move_recenters() {
        let (mut client, _) = joined();
        client.handle_frame(r#"{"action":"players_moved","players":{"me":{"x":1200,"y":1100}}}"#);
        assert_eq!(client.viewport().origin(), DVec2::new(800.0, 800.0));

        // Remote moves leave the viewport alone.
        client.handle_frame(r#"{"action":"players_moved","players":{"bob":{"x":10,"y":10}}}"#);
        assert_eq!(client.viewport().origin(), DVec2::new(800.0, 800.0));
    }

    #[test]
    fn test_malformed_frame_leaves_world_unchanged() {
        let (mut client, _) = joined();
        let before = client.entities();
        for frame in ["{\"action\":\"players_moved\",\"players\":", "", "\u{1F600}", "{\"action\":\"warp\"}"] {
            client.handle_frame(frame);
        }
        assert_eq!(client.entities(), before);
    }

    #[test]
    fn test_held_key_resends_then_single_stop() {
        let (mut client, wire) = joined();
        let input = client.input_queue();

        input.borrow_mut().push_back(InputEvent::KeyDown(Direction::Left));
        let mut t = 0.0;
        while t <= 350.0 {
            client.update(t);
            t += 50.0;
        }
        input.borrow_mut().push_back(InputEvent::KeyUp(Direction::Left));
        client.update(t);
        for _ in 0..10 {
            t += 50.0;
            client.update(t);
        }

        let messages = sent(&wire);
        let left = ClientMessage::Move { direction: Direction::Left };
        assert_eq!(messages.iter().filter(|m| **m == ClientMessage::Stop).count(), 1);
        assert_eq!(messages.last(), Some(&ClientMessage::Stop));
        assert!(messages.iter().filter(|m| **m == left).count() >= 4);
    }

    #[test]
    fn test_update_ticks_alone_drain_and_resend() {
        let (mut client, wire) = joined();
        for i in 0..1000 {
            let x = 900 + i % 50;
            push(
                &client,
                NetEventKind::Frame(format!(r#"{{"action":"players_moved","players":{{"bob":{{"x":{x}}}}}}}"#)),
            );
        }
        client.input_queue().borrow_mut().push_back(InputEvent::KeyDown(Direction::Up));

        let step = client.config().update_interval_ms;
        let mut t = 0.0;
        while t < 1000.0 {
            client.update(t);
            t += step;
        }

        assert!(client.net_events.borrow().is_empty());
        assert_eq!(client.world().player("bob").map(|p| p.x), Some(949.0));
        let up = ClientMessage::Move { direction: Direction::Up };
        let moves = sent(&wire).iter().filter(|m| **m == up).count();
        assert!((9..=11).contains(&moves), "{moves} move frames in one second");
    }

    #[test]
    fn test_keys_ignored_while_disconnected() {
        let (mut client, wire) = joined();
        push(&client, NetEventKind::Closed { code: 1006 });
        client.update(10.0);
        client.input_queue().borrow_mut().push_back(InputEvent::KeyDown(Direction::Up));
        client.update(20.0);
        assert!(sent(&wire).is_empty());
    }

    #[test]
    fn test_close_reconnects_once_after_delay() {
        let (mut client, wire) = joined();
        push(&client, NetEventKind::Closed { code: 1006 });
        client.update(100.0);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);

        client.update(3000.0);
        assert_eq!(wire.borrow().opened, vec![1]);
        client.update(3100.0);
        assert_eq!(wire.borrow().opened, vec![1, 2]);
        client.update(9000.0);
        assert_eq!(wire.borrow().opened, vec![1, 2]);
        // The world is kept across reconnects.
        assert_eq!(client.player_count(), 2);
    }

    #[test]
    fn test_stale_transport_events_are_ignored() {
        let (mut client, wire) = joined();
        push(&client, NetEventKind::Closed { code: 1006 });
        client.update(0.0);
        client.update(3000.0);
        push(&client, NetEventKind::Opened);
        client.update(3001.0);
        assert!(client.is_connected());

        client.net_events.borrow_mut().push_back(NetEvent {
            generation: 1,
            kind: NetEventKind::Closed { code: 1000 },
        });
        client.net_events.borrow_mut().push_back(NetEvent {
            generation: 1,
            kind: NetEventKind::Frame(r#"{"action":"player_left","playerId":"bob"}"#.into()),
        });
        client.update(3002.0);
        assert!(client.is_connected());
        assert_eq!(client.player_count(), 2);
        assert_eq!(wire.borrow().opened, vec![1, 2]);
    }

    #[test]
    fn test_player_left_prunes_shadow_next_tick() {
        let (mut client, _) = joined();
        client.update(1.0);
        assert!(client.interpolator().shadow("bob").is_some());

        client.handle_frame(r#"{"action":"player_left","playerId":"bob"}"#);
        client.update(2.0);
        assert!(client.interpolator().shadow("bob").is_none());
        assert_eq!(client.player_count(), 1);
    }

    #[test]
    fn test_entities_sorted_by_depth() {
        let (client, _) = joined();
        let ids: Vec<String> = client.entities().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["bob", "me"]);
        assert!(client.entities().iter().any(|e| e.id == "me" && e.is_local));
    }

    #[test]
    fn test_smooth_movement_draws_shadows() {
        let connector = FakeConnector::default();
        let config = ClientConfig {
            smooth_movement: true,
            ..ClientConfig::default()
        };
        let mut client = GameClient::new(config, Box::new(connector), 800.0, 600.0);
        client.start(0.0);
        push(&client, NetEventKind::Opened);
        push(&client, NetEventKind::Frame(JOIN_OK.to_string()));
        client.update(0.0);

        client.handle_frame(r#"{"action":"players_moved","players":{"bob":{"x":1000}}}"#);
        client.update(16.0);
        let bob = client.entities().into_iter().find(|e| e.id == "bob").unwrap();
        assert!((bob.position.x - 910.0).abs() < 1e-9);
    }

    #[test]
    fn test_chat_in_and_out() {
        let (mut client, wire) = joined();
        client.handle_frame(r#"{"action":"chat","username":"Bob","message":"hi"}"#);
        client.handle_frame(r#"{"action":"chat","username":"","message":"ghost"}"#);
        let last = client.chat().entries().last().unwrap();
        assert_eq!((last.username.as_str(), last.message.as_str()), ("Bob", "hi"));
        assert_eq!(client.chat().len(), 2);

        assert!(!client.send_chat("   "));
        assert!(client.send_chat("  hello "));
        assert_eq!(sent(&wire), vec![ClientMessage::Chat { message: "hello".into() }]);
    }

    #[test]
    fn test_overview_click_and_resize() {
        let (mut client, _) = joined();
        let input = client.input_queue();
        input
            .borrow_mut()
            .push_back(InputEvent::OverviewClick(DVec2::new(0.0, 0.0)));
        client.update(0.0);
        assert_eq!(client.viewport().origin(), DVec2::ZERO);

        input.borrow_mut().push_back(InputEvent::Resize { width: 1024.0, height: 768.0 });
        client.update(1.0);
        assert_eq!(client.viewport().size(), DVec2::new(1024.0, 768.0));
    }
}
