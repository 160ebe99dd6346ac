//! Mission Event Hooks
//!
//! World events the host reports to the mission engine, and the transitions
//! they trigger.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api::{CharacterId, MissionHolder, MissionId, WorldView};
use super::definition::GoalKind;
use super::world::WorldMissions;

/// What kind of creature died
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureKind {
    Monster {
        /// Mission this monster was spawned for
        mission_id: Option<MissionId>,
    },
    Npc {
        id: CharacterId,
    },
    /// The active player character
    Player,
}

/// A creature death reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureDeath {
    pub kind: CreatureKind,
    /// Hallucinations dying mean nothing
    pub hallucination: bool,
}

impl CreatureDeath {
    pub fn monster(mission_id: Option<MissionId>) -> Self {
        Self {
            kind: CreatureKind::Monster { mission_id },
            hallucination: false,
        }
    }

    pub fn npc(id: CharacterId) -> Self {
        Self {
            kind: CreatureKind::Npc { id },
            hallucination: false,
        }
    }

    pub fn player() -> Self {
        Self {
            kind: CreatureKind::Player,
            hallucination: false,
        }
    }

    pub fn hallucinated(mut self) -> Self {
        self.hallucination = true;
        self
    }
}

/// Events that can move missions along
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MissionEvent {
    /// Something died
    CreatureDied(CreatureDeath),
    /// World time moved forward one tick
    TurnAdvanced,
}

impl MissionEvent {
    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            MissionEvent::CreatureDied(_) => "creature_died",
            MissionEvent::TurnAdvanced => "turn_advanced",
        }
    }
}

impl WorldMissions {
    /// Dispatch a host event. `player` is the active character.
    pub fn handle_event(&mut self, event: &MissionEvent, player: &mut dyn MissionHolder, world: &dyn WorldView) {
        debug!("Mission event: {}", event.event_type());
        match event {
            MissionEvent::CreatureDied(death) => self.on_creature_death(death, player, world),
            MissionEvent::TurnAdvanced => self.process_all(world, player),
        }
    }

    /// React to a creature dying.
    pub fn on_creature_death(&mut self, death: &CreatureDeath, player: &mut dyn MissionHolder, world: &dyn WorldView) {
        if death.hallucination {
            return;
        }

        match death.kind {
            CreatureKind::Monster { mission_id: None } => {}
            CreatureKind::Monster { mission_id: Some(id) } => self.on_mission_monster_death(id, player, world),
            CreatureKind::Player => self.on_player_death(player),
            CreatureKind::Npc { id } => self.on_npc_death(id, player, world),
        }
    }

    fn on_mission_monster_death(&mut self, id: MissionId, player: &mut dyn MissionHolder, world: &dyn WorldView) {
        let Some(goal) = self.find(id).and_then(|m| self.template_of(m)).map(|t| t.goal) else {
            return;
        };

        match goal {
            GoalKind::FindMonster => self.fail(id, player),
            GoalKind::KillMonster => self.step_complete(id, 1, world),
            _ => {}
        }
    }

    /// Missions of a dead player become free for reuse. They keep their
    /// status; a dead character's in-progress missions stay in progress.
    fn on_player_death(&mut self, player: &dyn MissionHolder) {
        for id in player.active_missions() {
            if let Some(mission) = self.find_mut(id) {
                mission.clear_assignment();
            }
        }
    }

    fn on_npc_death(&mut self, dead: CharacterId, player: &mut dyn MissionHolder, world: &dyn WorldView) {
        let affected: Vec<(MissionId, GoalKind)> = self
            .missions
            .values()
            .filter(|m| m.in_progress())
            .filter_map(|m| self.template_of(m).map(|t| (m.id(), t.goal)))
            .collect();

        for (id, goal) in affected {
            let Some(mission) = self.missions.get(&id) else {
                continue;
            };
            let target_died = mission.target_npc_id == Some(dead);
            let giver_died = mission.npc_id() == Some(dead);

            if goal == GoalKind::Assassinate && target_died {
                self.step_complete(id, 1, world);
            }
            // The mission giver or the recruit target is gone
            if giver_died || (goal == GoalKind::RecruitNpc && target_died) {
                self.fail(id, player);
            }
        }
    }
}
