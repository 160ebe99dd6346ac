//! World Mission Registry
//!
//! Owns every mission instance created in the current world. Missions are
//! never removed individually; they stay as history until `clear_all`.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use super::api::{CharacterId, IdAllocator, MissionHolder, MissionId, Tripoint, WorldView};
use super::definition::{MissionOrigin, MissionTemplate};
use super::goal::GoalEvaluator;
use super::registry::TemplateRegistry;
use super::state::Mission;
use crate::config::MissionConfig;
use crate::error::Result;

/// All mission instances of one world
pub struct WorldMissions {
    templates: Arc<TemplateRegistry>,
    pub(crate) missions: HashMap<MissionId, Mission>,
    evaluator: GoalEvaluator,
    rng: StdRng,
}

impl WorldMissions {
    pub fn new(templates: Arc<TemplateRegistry>) -> Self {
        Self {
            templates,
            missions: HashMap::new(),
            evaluator: GoalEvaluator::default(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_config(templates: Arc<TemplateRegistry>, config: &MissionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            templates,
            missions: HashMap::new(),
            evaluator: GoalEvaluator::from_config(config),
            rng,
        }
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Template of `mission`, degrading to the first registered one.
    pub fn template_of(&self, mission: &Mission) -> Option<Arc<MissionTemplate>> {
        self.templates.get_or_first(mission.template_id())
    }

    // ========================================================================
    // Creation and lookup
    // ========================================================================

    /// Create and register a mission from `template_id`.
    pub fn reserve_new(
        &mut self,
        template_id: &str,
        npc_id: Option<CharacterId>,
        ids: &mut dyn IdAllocator,
        world: &dyn WorldView,
    ) -> Option<&mut Mission> {
        let Some(template) = self.templates.get(template_id) else {
            error!("cannot reserve mission from unknown template '{}'", template_id);
            return None;
        };

        let mission = template.create(npc_id, ids, world.turn(), &mut self.rng);
        let uid = mission.id();
        info!("Reserved mission {} ({}) from {:?}", uid, template_id, npc_id);

        if self.missions.insert(uid, mission).is_some() {
            warn!("Mission id {} was already in use, overwriting", uid);
        }
        self.missions.get_mut(&uid)
    }

    /// Reserve a mission from a random template eligible for `origin` at `location`.
    pub fn reserve_random(
        &mut self,
        origin: MissionOrigin,
        location: &Tripoint,
        npc_id: Option<CharacterId>,
        ids: &mut dyn IdAllocator,
        world: &dyn WorldView,
    ) -> Option<&mut Mission> {
        let template_id = self.templates.get_random_id(origin, location, &mut self.rng)?;
        self.reserve_new(&template_id, npc_id, ids, world)
    }

    /// Look up a mission. A miss is logged as an error.
    pub fn find(&self, id: MissionId) -> Option<&Mission> {
        let found = self.missions.get(&id);
        if found.is_none() {
            error!("requested mission with uid {} does not exist", id);
        }
        found
    }

    pub fn find_mut(&mut self, id: MissionId) -> Option<&mut Mission> {
        let found = self.missions.get_mut(&id);
        if found.is_none() {
            error!("requested mission with uid {} does not exist", id);
        }
        found
    }

    /// Every mission held, in no particular order.
    pub fn get_all_active(&self) -> Vec<&Mission> {
        self.missions.values().collect()
    }

    /// Insert a pre-built mission, replacing any with the same id.
    pub fn add_existing(&mut self, mission: Mission) {
        self.missions.insert(mission.id(), mission);
    }

    /// Drop every mission. Only for world teardown.
    pub fn clear_all(&mut self) {
        info!("Clearing {} missions", self.missions.len());
        self.missions.clear();
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    /// Resolve persisted ids, dropping any that no longer exist.
    pub fn to_missions(&self, ids: &[MissionId]) -> Vec<&Mission> {
        ids.iter().filter_map(|id| self.missions.get(id)).collect()
    }

    pub fn to_ids(missions: &[&Mission]) -> Vec<MissionId> {
        missions.iter().map(|m| m.id()).collect()
    }

    // ========================================================================
    // Transitions by id
    // ========================================================================

    /// Resolve a mission and its template together.
    fn resolve_mut(&mut self, id: MissionId) -> Option<(&mut Mission, Arc<MissionTemplate>)> {
        let templates = Arc::clone(&self.templates);
        let mission = self.find_mut(id)?;
        let template = templates.get_or_first(mission.template_id())?;
        Some((mission, template))
    }

    pub fn assign(&mut self, id: MissionId, who: &mut dyn MissionHolder) {
        if let Some((mission, template)) = self.resolve_mut(id) {
            mission.assign(&template, who);
        }
    }

    pub fn step_complete(&mut self, id: MissionId, step: i32, world: &dyn WorldView) {
        if let Some((mission, template)) = self.resolve_mut(id) {
            mission.step_complete(&template, step, world);
        }
    }

    pub fn fail(&mut self, id: MissionId, player: &mut dyn MissionHolder) {
        if let Some((mission, template)) = self.resolve_mut(id) {
            mission.fail(&template, player);
        }
    }

    pub fn wrap_up(&mut self, id: MissionId, player: &mut dyn MissionHolder) {
        if let Some((mission, template)) = self.resolve_mut(id) {
            mission.wrap_up(&template, player);
        }
    }

    /// Goal check for mission `id`; unknown missions are never complete.
    pub fn is_complete(
        &self,
        id: MissionId,
        querying_npc: CharacterId,
        player: &dyn MissionHolder,
        world: &dyn WorldView,
    ) -> bool {
        let Some(mission) = self.find(id) else {
            return false;
        };
        match self.template_of(mission) {
            Some(template) => self
                .evaluator
                .is_complete(mission, &template, querying_npc, player, world),
            None => false,
        }
    }

    /// Template name, or "NULL" when the template is unknown.
    pub fn name(&self, id: MissionId) -> String {
        self.find(id)
            .and_then(|m| self.templates.get(m.template_id()))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "NULL".to_string())
    }

    pub fn dialogue_for_topic(&self, id: MissionId, topic: &str) -> Option<String> {
        let mission = self.find(id)?;
        let template = self.template_of(mission)?;
        Some(template.dialogue_for_topic(topic))
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Fail every in-progress mission whose deadline has passed.
    pub fn process_all(&mut self, world: &dyn WorldView, player: &mut dyn MissionHolder) {
        let now = world.turn();
        let expired: Vec<MissionId> = self
            .missions
            .values()
            .filter(|m| m.is_overdue(now))
            .map(|m| m.id())
            .collect();

        for id in expired {
            debug!("Mission {} passed its deadline at turn {}", id, now);
            self.fail(id, player);
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Serialize every mission to JSON, ordered by id.
    pub fn to_json(&self) -> Result<String> {
        let mut missions: Vec<&Mission> = self.missions.values().collect();
        missions.sort_by_key(|m| m.id());
        Ok(serde_json::to_string_pretty(&missions)?)
    }

    /// Restore missions from a JSON snapshot. Returns how many were added.
    pub fn restore_json(&mut self, json: &str) -> Result<usize> {
        let missions: Vec<Mission> = serde_json::from_str(json)?;
        let count = missions.len();
        for mission in missions {
            self.add_existing(mission);
        }
        info!("Restored {} missions from snapshot", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::api::SequentialIds;
    use crate::mission::definition::GoalKind;
    use crate::error::MissionError;
    use crate::mission::state::MissionStatus;
    use crate::sandbox::{SandboxCharacter, SandboxWorld};

    fn registry() -> Arc<TemplateRegistry> {
        let mut registry = TemplateRegistry::new();

        let mut water = MissionTemplate::new("MISSION_GET_WATER", "Find Clean Water", GoalKind::FindItem);
        water.item_id = Some("water_clean".to_string());
        water.item_count = 3;
        water.origins = vec![MissionOrigin::AnyNpc];
        registry.register(water);

        let mut timed = MissionTemplate::new("MISSION_TIMED", "Timed", GoalKind::GoTo);
        timed.deadline_low = 100;
        timed.deadline_high = 100;
        registry.register(timed);

        Arc::new(registry)
    }

    fn missions() -> WorldMissions {
        let config = MissionConfig {
            seed: Some(11),
            ..MissionConfig::default()
        };
        WorldMissions::with_config(registry(), &config)
    }

    #[test]
    fn test_reserve_and_find() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        let mut ids = SequentialIds::new();

        let id = world_missions
            .reserve_new("MISSION_GET_WATER", Some(CharacterId(5)), &mut ids, &world)
            .map(|m| m.id())
            .unwrap();

        assert_eq!(world_missions.len(), 1);
        assert_eq!(world_missions.find(id).unwrap().npc_id(), Some(CharacterId(5)));
        assert_eq!(world_missions.name(id), "Find Clean Water");
        assert!(world_missions.find(MissionId(999)).is_none());
        assert_eq!(world_missions.name(MissionId(999)), "NULL");
    }

    #[test]
    fn test_reserve_unknown_template() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        assert!(world_missions.reserve_new("NOPE", None, &mut SequentialIds::new(), &world).is_none());
        assert!(world_missions.is_empty());
    }

    #[test]
    fn test_reserve_random_without_candidates() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        let mission = world_missions.reserve_random(
            MissionOrigin::Computer,
            &Tripoint::new(0, 0, 0),
            None,
            &mut SequentialIds::new(),
            &world,
        );
        assert!(mission.is_none());
    }

    #[test]
    fn test_reserve_random_picks_eligible() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        let mission = world_missions
            .reserve_random(
                MissionOrigin::AnyNpc,
                &Tripoint::new(0, 0, 0),
                Some(CharacterId(2)),
                &mut SequentialIds::new(),
                &world,
            )
            .unwrap();
        assert_eq!(mission.template_id(), "MISSION_GET_WATER");
    }

    #[test]
    fn test_id_collision_overwrites() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();

        world_missions.reserve_new("MISSION_GET_WATER", None, &mut SequentialIds::starting_at(4), &world);
        world_missions.reserve_new("MISSION_TIMED", None, &mut SequentialIds::starting_at(4), &world);

        assert_eq!(world_missions.len(), 1);
        assert_eq!(world_missions.find(MissionId(4)).unwrap().template_id(), "MISSION_TIMED");
    }

    #[test]
    fn test_deadline_sweep_boundary() {
        let mut world_missions = missions();
        let mut world = SandboxWorld::new();
        world.set_turn(500);
        let mut ids = SequentialIds::new();
        let mut player = SandboxCharacter::new(CharacterId(1));

        let id = world_missions
            .reserve_new("MISSION_TIMED", None, &mut ids, &world)
            .map(|m| m.id())
            .unwrap();
        assert_eq!(world_missions.find(id).unwrap().deadline(), Some(600));

        // Not started yet: never expires
        world.set_turn(700);
        world_missions.process_all(&world, &mut player);
        assert_eq!(world_missions.find(id).unwrap().status(), MissionStatus::YetToStart);

        world_missions.assign(id, &mut player);
        world.set_turn(600);
        world_missions.process_all(&world, &mut player);
        assert!(world_missions.find(id).unwrap().in_progress());

        world.set_turn(601);
        world_missions.process_all(&world, &mut player);
        assert!(world_missions.find(id).unwrap().has_failed());
        assert_eq!(player.failed_missions(), &[id]);
    }

    #[test]
    fn test_id_conversions_drop_unknown() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        let mut ids = SequentialIds::new();
        let a = world_missions.reserve_new("MISSION_GET_WATER", None, &mut ids, &world).unwrap().id();
        let b = world_missions.reserve_new("MISSION_TIMED", None, &mut ids, &world).unwrap().id();

        let resolved = world_missions.to_missions(&[a, MissionId(77), b]);
        assert_eq!(WorldMissions::to_ids(&resolved), vec![a, b]);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        let mut ids = SequentialIds::new();
        let mut player = SandboxCharacter::new(CharacterId(1));
        let id = world_missions.reserve_new("MISSION_GET_WATER", None, &mut ids, &world).unwrap().id();
        world_missions.assign(id, &mut player);

        let json = world_missions.to_json().unwrap();
        assert!(json.contains("\"in_progress\""));

        let mut restored = WorldMissions::new(registry());
        assert_eq!(restored.restore_json(&json).unwrap(), 1);
        assert_eq!(restored.find(id), world_missions.find(id));

        restored.clear_all();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_restore_rejects_unknown_status() {
        let mut world_missions = missions();
        let world = SandboxWorld::new();
        world_missions.reserve_new("MISSION_GET_WATER", None, &mut SequentialIds::new(), &world);
        let json = world_missions.to_json().unwrap().replace("yet_to_start", "abandoned");

        let mut restored = WorldMissions::new(registry());
        let err = restored.restore_json(&json).unwrap_err();
        assert!(matches!(err, MissionError::Snapshot(_)));
        assert!(err.to_string().contains("invalid mission status string: 'abandoned'"));
        assert!(restored.is_empty());
    }

    #[test]
    fn test_unknown_template_degrades_to_first() {
        let mut world_missions = missions();
        let mut player = SandboxCharacter::new(CharacterId(1));
        world_missions.add_existing(Mission::blank(MissionId(30), "MISSION_REMOVED"));

        world_missions.assign(MissionId(30), &mut player);
        assert!(world_missions.find(MissionId(30)).unwrap().in_progress());
        assert_eq!(
            world_missions.dialogue_for_topic(MissionId(30), "offer").unwrap(),
            "Someone forgot to code this message id is MISSION_GET_WATER, topic is offer!"
        );
    }
}
