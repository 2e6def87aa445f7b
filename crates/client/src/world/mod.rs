// Mirrored world registry - players and avatar definitions as dictated by the server
//
// Every mutator is a pure state transition. Instead of returning anything it records a
// `WorldChange`; the owner drains them after each frame and invalidates derived views.
use std::collections::HashMap;

use protocol::{AvatarDef, Player, PlayerUpdate};

/// Notification emitted by a WorldState mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldChange {
    /// Both registries were replaced by a join response.
    Reset,
    /// A player was inserted or overwritten.
    PlayerJoined(String),
    /// Known players moved; `local` is set when the local player was among them.
    PlayersMoved { local: bool },
    /// A player was removed.
    PlayerLeft(String),
}

#[derive(Debug, Default)]
pub struct WorldState {
    players: HashMap<String, Player>,
    avatars: HashMap<String, AvatarDef>,
    local_id: Option<String>,
    changes: Vec<WorldChange>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both registries and mark `self_id` as the local player.
    ///
    /// Map keys are authoritative: each player's id is set from its key.
    pub fn apply_join_result(
        &mut self,
        self_id: String,
        players: HashMap<String, Player>,
        avatars: HashMap<String, AvatarDef>,
    ) {
        self.players = players
            .into_iter()
            .map(|(id, mut player)| {
                player.id.clone_from(&id);
                (id, player)
            })
            .collect();
        self.avatars = avatars;
        self.local_id = Some(self_id);
        self.changes.push(WorldChange::Reset);
    }

    /// Insert/overwrite the player; the avatar replaces any definition under its key.
    pub fn apply_player_joined(&mut self, player: Player, avatar: AvatarDef) {
        let id = player.id.clone();
        let key = if avatar.name.is_empty() {
            player.avatar_key.clone()
        } else {
            avatar.name.clone()
        };
        self.avatars.insert(key, avatar);
        self.players.insert(id.clone(), player);
        self.changes.push(WorldChange::PlayerJoined(id));
    }

    /// Merge deltas into known players. Unknown ids are ignored: deltas never create players.
    pub fn apply_players_moved(&mut self, updates: &HashMap<String, PlayerUpdate>) {
        let mut moved = false;
        let mut local = false;
        for (id, update) in updates {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            player.apply(update);
            moved = true;
            local |= self.local_id.as_deref() == Some(id.as_str());
        }
        if moved {
            self.changes.push(WorldChange::PlayersMoved { local });
        }
    }

    /// Remove a player. Removing an absent id is a no-op.
    pub fn apply_player_left(&mut self, id: &str) {
        if self.players.remove(id).is_some() {
            self.changes.push(WorldChange::PlayerLeft(id.to_string()));
        }
    }

    /// Drain pending change notifications.
    pub fn take_changes(&mut self) -> Vec<WorldChange> {
        std::mem::take(&mut self.changes)
    }

    #[inline]
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    #[inline]
    pub fn avatar(&self, key: &str) -> Option<&AvatarDef> {
        self.avatars.get(key)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &AvatarDef> {
        self.avatars.values()
    }

    #[inline]
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_id.as_deref().and_then(|id| self.players.get(id))
    }

    #[inline]
    pub fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
