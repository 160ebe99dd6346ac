//! In-memory host
//!
//! Minimal player and world used by the simulator binary and by tests. Real
//! hosts implement `MissionHolder` and `WorldView` over their own storage.

use std::collections::{HashMap, HashSet};

use crate::mission::api::{
    Attitude, CharacterId, MissionHolder, MissionId, MonsterInfo, NpcInfo, Tick, Tripoint, WorldView,
};
use crate::mission::state::Mission;

// ============================================================================
// Character
// ============================================================================

/// A player character with a flat inventory
#[derive(Debug, Clone)]
pub struct SandboxCharacter {
    id: CharacterId,
    location: Tripoint,
    items: HashMap<String, i32>,
    charges: HashMap<String, i32>,
    mission_items: HashSet<MissionId>,
    active: Vec<MissionId>,
    assignments: Vec<MissionId>,
    completed: Vec<MissionId>,
    failed: Vec<MissionId>,
}

impl SandboxCharacter {
    pub fn new(id: CharacterId) -> Self {
        Self {
            id,
            location: Tripoint::default(),
            items: HashMap::new(),
            charges: HashMap::new(),
            mission_items: HashSet::new(),
            active: Vec::new(),
            assignments: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn set_location(&mut self, location: Tripoint) {
        self.location = location;
    }

    pub fn give_item(&mut self, item_id: &str, count: i32) {
        *self.items.entry(item_id.to_string()).or_insert(0) += count;
    }

    /// Add charges to a charged item (water in a container, batteries).
    pub fn give_charges(&mut self, item_id: &str, charges: i32) {
        *self.charges.entry(item_id.to_string()).or_insert(0) += charges;
    }

    /// Give an item tagged for `mission`.
    pub fn give_mission_item(&mut self, mission: MissionId) {
        self.mission_items.insert(mission);
    }

    pub fn item_amount(&self, item_id: &str) -> i32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// Every assignment ever received, in order.
    pub fn assignments(&self) -> &[MissionId] {
        &self.assignments
    }

    pub fn completed_missions(&self) -> &[MissionId] {
        &self.completed
    }

    pub fn failed_missions(&self) -> &[MissionId] {
        &self.failed
    }
}

impl MissionHolder for SandboxCharacter {
    fn character_id(&self) -> CharacterId {
        self.id
    }

    fn location(&self) -> Tripoint {
        self.location
    }

    fn active_missions(&self) -> Vec<MissionId> {
        self.active.clone()
    }

    fn on_mission_assignment(&mut self, mission: &Mission) {
        let id = mission.id();
        if !self.active.contains(&id) {
            self.active.push(id);
        }
        self.assignments.push(id);
    }

    fn on_mission_finished(&mut self, mission: &Mission) {
        let id = mission.id();
        self.active.retain(|m| *m != id);
        if mission.has_failed() {
            self.failed.push(id);
        } else {
            self.completed.push(id);
        }
    }

    fn has_amount(&self, item_id: &str, count: i32) -> bool {
        self.item_amount(item_id) >= count
    }

    fn has_charges(&self, item_id: &str, charges: i32) -> bool {
        self.charges.get(item_id).is_some_and(|held| *held >= charges)
    }

    fn has_mission_item(&self, mission: MissionId) -> bool {
        self.mission_items.contains(&mission)
    }

    fn remove_mission_items(&mut self, mission: MissionId) {
        self.mission_items.remove(&mission);
    }

    fn consume_items(&mut self, item_id: &str, count: i32) {
        if let Some(held) = self.items.get_mut(item_id) {
            *held = (*held - count).max(0);
        }
    }
}

// ============================================================================
// World
// ============================================================================

/// A world with NPCs, monsters and a sparse overmap
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    turn: Tick,
    npcs: HashMap<CharacterId, NpcInfo>,
    location_types: HashMap<Tripoint, String>,
    monsters: Vec<MonsterInfo>,
    kills: HashMap<String, i32>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_turn(&mut self, turn: Tick) {
        self.turn = turn;
    }

    pub fn advance(&mut self, turns: Tick) {
        self.turn += turns;
    }

    pub fn add_npc(&mut self, id: CharacterId, class: &str, location: Tripoint) {
        self.npcs.insert(
            id,
            NpcInfo {
                id,
                class: class.to_string(),
                attitude: Attitude::Neutral,
                location,
            },
        );
    }

    pub fn remove_npc(&mut self, id: CharacterId) {
        self.npcs.remove(&id);
    }

    pub fn set_attitude(&mut self, id: CharacterId, attitude: Attitude) {
        if let Some(npc) = self.npcs.get_mut(&id) {
            npc.attitude = attitude;
        }
    }

    pub fn set_location_type(&mut self, at: Tripoint, location_type: &str) {
        self.location_types.insert(at, location_type.to_string());
    }

    pub fn add_monster(&mut self, monster_type: &str, mission_id: Option<MissionId>) {
        self.monsters.push(MonsterInfo {
            monster_type: monster_type.to_string(),
            mission_id,
        });
    }

    /// Remove the first monster spawned for `mission_id`.
    pub fn remove_mission_monster(&mut self, mission_id: MissionId) -> bool {
        match self.monsters.iter().position(|m| m.mission_id == Some(mission_id)) {
            Some(index) => {
                let monster = self.monsters.remove(index);
                self.record_kill(&monster.monster_type);
                true
            }
            None => false,
        }
    }

    pub fn record_kill(&mut self, monster_type: &str) {
        *self.kills.entry(monster_type.to_string()).or_insert(0) += 1;
    }
}

impl WorldView for SandboxWorld {
    fn turn(&self) -> Tick {
        self.turn
    }

    fn find_npc(&self, id: CharacterId) -> Option<NpcInfo> {
        self.npcs.get(&id).cloned()
    }

    fn location_type(&self, at: Tripoint) -> Option<String> {
        self.location_types.get(&at).cloned()
    }

    fn npcs_near(&self, center: Tripoint, radius: i32) -> Vec<NpcInfo> {
        let mut near: Vec<NpcInfo> = self
            .npcs
            .values()
            .filter(|npc| npc.location.distance(&center) <= radius)
            .cloned()
            .collect();
        near.sort_by_key(|npc| npc.id);
        near
    }

    fn monsters(&self) -> Vec<MonsterInfo> {
        self.monsters.clone()
    }

    fn kill_count(&self, monster_type: &str) -> i32 {
        self.kills.get(monster_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_never_goes_negative() {
        let mut player = SandboxCharacter::new(CharacterId(1));
        player.give_item("rock", 2);
        player.consume_items("rock", 5);
        assert_eq!(player.item_amount("rock"), 0);
        assert!(!player.has_amount("rock", 1));
    }

    #[test]
    fn test_npcs_near_uses_grid_distance() {
        let mut world = SandboxWorld::new();
        world.add_npc(CharacterId(2), "doctor", Tripoint::new(5, 5, 0));
        world.add_npc(CharacterId(1), "doctor", Tripoint::new(-3, 0, 0));
        world.add_npc(CharacterId(3), "doctor", Tripoint::new(6, 0, 0));

        let near: Vec<CharacterId> = world
            .npcs_near(Tripoint::default(), 5)
            .into_iter()
            .map(|npc| npc.id)
            .collect();
        assert_eq!(near, vec![CharacterId(1), CharacterId(2)]);
    }

    #[test]
    fn test_killing_mission_monster_counts() {
        let mut world = SandboxWorld::new();
        world.add_monster("mon_bear", Some(MissionId(4)));
        assert!(world.remove_mission_monster(MissionId(4)));
        assert!(!world.remove_mission_monster(MissionId(4)));
        assert_eq!(world.kill_count("mon_bear"), 1);
        assert!(world.monsters().is_empty());
    }
}
