//! Goal Evaluation
//!
//! Pure completion checks. Nothing here mutates a mission or caches a result,
//! so evaluating after an event hook always sees the hook's effects.

use super::api::{Attitude, CharacterId, MissionHolder, WorldView};
use super::definition::{GoalKind, MissionTemplate};
use super::state::{Mission, MissionStatus};
use crate::config::MissionConfig;

/// Completion predicate with its tunable radii
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalEvaluator {
    /// Radius searched for recruit-by-class goals
    pub recruit_search_radius: i32,
    /// Go-to goals succeed within this distance of the target
    pub report_radius: i32,
}

impl Default for GoalEvaluator {
    fn default() -> Self {
        Self {
            recruit_search_radius: 100,
            report_radius: 1,
        }
    }
}

impl GoalEvaluator {
    pub fn from_config(config: &MissionConfig) -> Self {
        Self {
            recruit_search_radius: config.recruit_search_radius,
            report_radius: config.report_radius,
        }
    }

    /// Is `mission` complete from the point of view of `querying_npc`?
    ///
    /// `player` is the active character whose location and holdings are checked.
    pub fn is_complete(
        &self,
        mission: &Mission,
        template: &MissionTemplate,
        querying_npc: CharacterId,
        player: &dyn MissionHolder,
        world: &dyn WorldView,
    ) -> bool {
        if mission.status() == MissionStatus::Success {
            return true;
        }

        // Missions handed out by someone have to be turned in to them
        let originator_ok = mission.npc_id().is_none_or(|giver| giver == querying_npc);

        match template.goal {
            GoalKind::GoTo => mission
                .target()
                .is_some_and(|target| player.location().distance(&target) <= self.report_radius),

            GoalKind::GoToType => match &template.target_location_type {
                Some(wanted) => world.location_type(player.location()).as_ref() == Some(wanted),
                None => false,
            },

            GoalKind::FindItem => {
                let Some(item_id) = mission.item_id() else {
                    return false;
                };
                let count = mission.item_count();
                let held = player.has_amount(item_id, count)
                    || (player.has_amount(item_id, 1) && player.has_charges(item_id, count));
                held && originator_ok
            }

            GoalKind::FindAnyItem => player.has_mission_item(mission.id()) && originator_ok,

            GoalKind::FindMonster => {
                originator_ok
                    && world
                        .monsters()
                        .iter()
                        .any(|monster| monster.mission_id == Some(mission.id()))
            }

            GoalKind::RecruitNpc => mission
                .target_npc_id
                .and_then(|id| world.find_npc(id))
                .is_some_and(|npc| npc.attitude == Attitude::Following),

            GoalKind::RecruitNpcClass => {
                let Some(class) = mission.recruit_class.as_deref() else {
                    return false;
                };
                world
                    .npcs_near(player.location(), self.recruit_search_radius)
                    .iter()
                    .any(|npc| npc.class == class && npc.attitude == Attitude::Following)
            }

            GoalKind::FindNpc => mission.npc_id() == Some(querying_npc),

            // Set by the death hook or an external trigger
            GoalKind::Assassinate | GoalKind::KillMonster | GoalKind::ComputerToggle => mission.step() >= 1,

            GoalKind::KillMonsterType => match mission.monster_type.as_deref() {
                Some(monster_type) => world.kill_count(monster_type) >= mission.monster_kill_goal,
                None => false,
            },

            GoalKind::Null => false,
        }
    }
}
