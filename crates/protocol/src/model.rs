//! Player and avatar records shared by every message.

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::Position;

/// The discrete direction an entity faces, selecting its sprite row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    #[default]
    South,
    East,
    West,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::North, Facing::South, Facing::East, Facing::West];

    pub fn as_str(self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::South => "south",
            Facing::East => "east",
            Facing::West => "west",
        }
    }

    pub fn parse(name: &str) -> Option<Facing> {
        Self::ALL.into_iter().find(|facing| facing.as_str() == name)
    }
}

/// A connected player as dictated by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Opaque id. Maps on the wire are keyed by it as well, so it may be omitted in values.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "username", default)]
    pub display_name: String,
    #[serde(rename = "avatar", default)]
    pub avatar_key: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub facing: Facing,
    #[serde(rename = "isMoving", default)]
    pub moving: bool,
    #[serde(default)]
    pub animation_frame: usize,
}

impl Player {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            avatar_key: String::new(),
            x,
            y,
            facing: Facing::default(),
            moving: false,
            animation_frame: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Merge a movement delta field by field. Fields absent from the delta keep their value.
    pub fn apply(&mut self, update: &PlayerUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(facing) = update.facing {
            self.facing = facing;
        }
        if let Some(moving) = update.moving {
            self.moving = moving;
        }
        if let Some(frame) = update.animation_frame {
            self.animation_frame = frame;
        }
        if let Some(name) = &update.display_name {
            self.display_name.clone_from(name);
        }
        if let Some(avatar) = &update.avatar_key {
            self.avatar_key.clone_from(avatar);
        }
    }
}

/// A (possibly partial) player record carried by `players_moved`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
    #[serde(rename = "isMoving", skip_serializing_if = "Option::is_none")]
    pub moving: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_frame: Option<usize>,
    #[serde(rename = "username", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_key: Option<String>,
}

impl From<&Player> for PlayerUpdate {
    fn from(player: &Player) -> Self {
        Self {
            x: Some(player.x),
            y: Some(player.y),
            facing: Some(player.facing),
            moving: Some(player.moving),
            animation_frame: Some(player.animation_frame),
            display_name: Some(player.display_name.clone()),
            avatar_key: Some(player.avatar_key.clone()),
        }
    }
}

/// Per-facing animation frames, kept in the order the server declared them.
///
/// Frame payloads are opaque image sources (URLs or `data:` URLs). Unknown
/// facing names are skipped when decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    rows: Vec<(Facing, Vec<String>)>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frames for `facing`. A facing declared twice keeps its first position.
    pub fn insert(&mut self, facing: Facing, frames: Vec<String>) {
        match self.rows.iter_mut().find(|(f, _)| *f == facing) {
            Some((_, existing)) => *existing = frames,
            None => self.rows.push((facing, frames)),
        }
    }

    pub fn get(&self, facing: Facing) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|(f, _)| *f == facing)
            .map(|(_, frames)| frames.as_slice())
    }

    /// The first declared facing and its frames.
    pub fn first(&self) -> Option<(Facing, &[String])> {
        self.rows.first().map(|(f, frames)| (*f, frames.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facing, &[String])> {
        self.rows.iter().map(|(f, frames)| (*f, frames.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for FrameTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (facing, frames) in &self.rows {
            map.serialize_entry(facing.as_str(), frames)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrameTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = FrameTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of facing names to frame lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FrameTable, A::Error> {
                let mut table = FrameTable::new();
                while let Some(key) = map.next_key::<String>()? {
                    match Facing::parse(&key) {
                        Some(facing) => {
                            let frames: Vec<String> = map.next_value()?;
                            table.insert(facing, frames);
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// An avatar definition: named set of per-facing frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub frames: FrameTable,
}
