//! Host Simulation API
//!
//! Identity types and the narrow collaborator traits the mission engine
//! consumes from the surrounding simulation. The host implements these
//! against its own creature, inventory and map storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::Mission;

/// Absolute world time, in turns.
pub type Tick = u64;

/// Process-wide unique mission instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub u32);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a player or NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u32);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World-map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tripoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Tripoint {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Grid distance: the largest per-axis difference, saturating at `i32::MAX`.
    pub fn distance(&self, other: &Tripoint) -> i32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        i32::try_from(dx.max(dy).max(dz)).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for Tripoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// How an NPC currently regards the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attitude {
    Neutral,
    /// Recruited; travels with the player
    Following,
    Hostile,
}

/// Snapshot of an NPC as seen by the mission engine.
#[derive(Debug, Clone)]
pub struct NpcInfo {
    pub id: CharacterId,
    pub class: String,
    pub attitude: Attitude,
    pub location: Tripoint,
}

/// Snapshot of a live monster.
#[derive(Debug, Clone)]
pub struct MonsterInfo {
    pub monster_type: String,
    /// Mission this monster was spawned for, if any
    pub mission_id: Option<MissionId>,
}

/// Source of fresh mission ids. One call per created instance.
pub trait IdAllocator {
    fn next_mission_id(&mut self) -> MissionId;
}

/// Monotonic id counter, persisted alongside the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequentialIds {
    next: u32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }
}

impl IdAllocator for SequentialIds {
    fn next_mission_id(&mut self) -> MissionId {
        let id = MissionId(self.next);
        self.next += 1;
        id
    }
}

/// Bookkeeping side of a character that can hold missions.
pub trait MissionHolder {
    fn character_id(&self) -> CharacterId;

    /// Current world-map location.
    fn location(&self) -> Tripoint;

    /// Ids of missions this character is working on.
    fn active_missions(&self) -> Vec<MissionId>;

    fn on_mission_assignment(&mut self, mission: &Mission);

    /// Called on success and on failure.
    fn on_mission_finished(&mut self, mission: &Mission);

    /// Whether the character holds `count` units of `item_id`.
    fn has_amount(&self, item_id: &str, count: i32) -> bool;

    /// Whether the character holds `charges` charges of `item_id`.
    fn has_charges(&self, item_id: &str, charges: i32) -> bool;

    /// Whether any held item is tagged for `mission`.
    fn has_mission_item(&self, mission: MissionId) -> bool;

    fn remove_mission_items(&mut self, mission: MissionId);

    fn consume_items(&mut self, item_id: &str, count: i32);
}

/// Read-only world queries.
pub trait WorldView {
    /// Current world time.
    fn turn(&self) -> Tick;

    /// Look up a living NPC.
    fn find_npc(&self, id: CharacterId) -> Option<NpcInfo>;

    /// Location type (terrain id) at a world-map point.
    fn location_type(&self, at: Tripoint) -> Option<String>;

    /// NPCs within `radius` of `center`.
    fn npcs_near(&self, center: Tripoint, radius: i32) -> Vec<NpcInfo>;

    /// Every live monster in the world.
    fn monsters(&self) -> Vec<MonsterInfo>;

    /// Cumulative kills of a monster type this world.
    fn kill_count(&self, monster_type: &str) -> i32;
}
