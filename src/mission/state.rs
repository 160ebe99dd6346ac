//! Mission Instance State
//!
//! One `Mission` per handed-out mission. Status only moves forward:
//! yet_to_start -> in_progress -> success | failure.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api::{CharacterId, MissionHolder, MissionId, Tick, Tripoint, WorldView};
use super::definition::{GoalKind, MissionTemplate};
use crate::error::MissionError;

/// Lifecycle status of a mission instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MissionStatus {
    /// Offered or reserved, nobody working on it yet
    YetToStart,
    InProgress,
    Success,
    Failure,
}

impl MissionStatus {
    /// Canonical name used in persisted data.
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::YetToStart => "yet_to_start",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::Success => "success",
            MissionStatus::Failure => "failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Success | MissionStatus::Failure)
    }
}

impl FromStr for MissionStatus {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yet_to_start" => Ok(MissionStatus::YetToStart),
            "in_progress" => Ok(MissionStatus::InProgress),
            "success" => Ok(MissionStatus::Success),
            "failure" => Ok(MissionStatus::Failure),
            _ => Err(MissionError::InvalidEnumString(s.to_string())),
        }
    }
}

impl TryFrom<String> for MissionStatus {
    type Error = MissionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reward record carried over from old saves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionReward {
    pub favor_type: i32,
    pub item_id: Option<String>,
    pub skill: i32,
}

/// A single mission instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub(crate) uid: MissionId,
    /// Template this instance was created from
    pub(crate) template_id: String,
    pub description: String,
    pub(crate) status: MissionStatus,
    pub(crate) value: i64,
    #[serde(default)]
    pub reward: MissionReward,
    pub(crate) item_id: Option<String>,
    pub(crate) item_count: i32,
    /// Where the player should go next
    pub(crate) target: Option<Tripoint>,
    pub recruit_class: Option<String>,
    /// Assassination victim or recruit target
    pub target_npc_id: Option<CharacterId>,
    pub monster_type: Option<String>,
    pub monster_kill_goal: i32,
    pub(crate) deadline: Option<Tick>,
    /// Originator; `None` when the environment handed it out
    pub(crate) npc_id: Option<CharacterId>,
    pub good_faction_id: Option<i32>,
    pub bad_faction_id: Option<i32>,
    /// Goal-specific progress counter
    pub(crate) step: i32,
    pub(crate) follow_up: Option<String>,
    /// Character working on this mission
    pub(crate) player_id: Option<CharacterId>,
}

impl Mission {
    /// Empty instance carrying only identity.
    pub(crate) fn blank(uid: MissionId, template_id: &str) -> Self {
        Self {
            uid,
            template_id: template_id.to_string(),
            description: String::new(),
            status: MissionStatus::YetToStart,
            value: 0,
            reward: MissionReward::default(),
            item_id: None,
            item_count: 1,
            target: None,
            recruit_class: None,
            target_npc_id: None,
            monster_type: None,
            monster_kill_goal: -1,
            deadline: None,
            npc_id: None,
            good_faction_id: None,
            bad_faction_id: None,
            step: 0,
            follow_up: None,
            player_id: None,
        }
    }

    /// Instance with goal parameters copied out of `template`. No deadline.
    pub fn from_template(uid: MissionId, template: &MissionTemplate, npc_id: Option<CharacterId>) -> Self {
        let mut mission = Self::blank(uid, &template.id);
        mission.npc_id = npc_id;
        mission.item_id = template.item_id.clone();
        mission.item_count = template.item_count;
        mission.value = template.value;
        mission.follow_up = template.follow_up.clone();
        mission.recruit_class = template.recruit_class.clone();
        mission.monster_type = template.monster_type.clone();
        mission.monster_kill_goal = template.monster_kill_goal;
        mission
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Hand the mission to `who`, starting it if it has not started yet.
    pub fn assign(&mut self, template: &MissionTemplate, who: &mut dyn MissionHolder) {
        let id = who.character_id();
        if self.player_id == Some(id) {
            warn!("strange: character {} is already assigned to mission {}", id, self.uid);
            return;
        }
        if let Some(current) = self.player_id {
            warn!(
                "tried to assign mission {} to character {}, but it is already assigned to {}",
                self.uid, id, current
            );
            return;
        }

        self.player_id = Some(id);
        if self.status == MissionStatus::YetToStart {
            (template.hooks.start)(self);
            self.status = MissionStatus::InProgress;
            debug!("Mission {} ({}) started by {}", self.uid, self.template_id, id);
        }
        who.on_mission_assignment(self);
    }

    /// Record progress. Goals that need reporting back re-target the originator.
    pub fn step_complete(&mut self, template: &MissionTemplate, step: i32, world: &dyn WorldView) {
        self.step = step;
        if template.goal.reports_back() {
            self.set_target_to_mission_giver(world);
        }
        debug!("Mission {} reached step {}", self.uid, step);
    }

    fn set_target_to_mission_giver(&mut self, world: &dyn WorldView) {
        self.target = self
            .npc_id
            .and_then(|id| world.find_npc(id))
            .map(|giver| giver.location);
    }

    /// Fail the mission. `player` is the currently active character.
    pub fn fail(&mut self, template: &MissionTemplate, player: &mut dyn MissionHolder) {
        if self.status != MissionStatus::InProgress {
            warn!("fail called on mission {} with status {}", self.uid, self.status);
            return;
        }

        self.status = MissionStatus::Failure;
        if self.player_id == Some(player.character_id()) {
            player.on_mission_finished(self);
        }
        (template.hooks.fail)(self);
        debug!("Mission {} ({}) failed", self.uid, self.template_id);
    }

    /// Complete the mission for the active character and take what it asked for.
    pub fn wrap_up(&mut self, template: &MissionTemplate, player: &mut dyn MissionHolder) {
        if self.status != MissionStatus::InProgress {
            warn!("wrap_up called on mission {} with status {}", self.uid, self.status);
            return;
        }
        if self.player_id != Some(player.character_id()) {
            warn!(
                "wrap_up of mission {}: assigned to {:?}, but active character is {}",
                self.uid,
                self.player_id,
                player.character_id()
            );
        }

        self.status = MissionStatus::Success;
        player.on_mission_finished(self);
        match template.goal {
            GoalKind::FindItem => {
                if let Some(item_id) = &self.item_id {
                    player.consume_items(item_id, self.item_count);
                }
            }
            GoalKind::FindAnyItem => player.remove_mission_items(self.uid),
            _ => {}
        }
        (template.hooks.end)(self);
        debug!("Mission {} ({}) succeeded", self.uid, self.template_id);
    }

    pub(crate) fn clear_assignment(&mut self) {
        self.player_id = None;
    }

    pub fn set_target(&mut self, target: Tripoint) {
        self.target = Some(target);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> MissionId {
        self.uid
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn has_failed(&self) -> bool {
        self.status == MissionStatus::Failure
    }

    pub fn in_progress(&self) -> bool {
        self.status == MissionStatus::InProgress
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Tick> {
        self.deadline
    }

    /// In progress with a deadline that `now` has passed.
    pub fn is_overdue(&self, now: Tick) -> bool {
        self.in_progress() && self.deadline.is_some_and(|deadline| now > deadline)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<Tripoint> {
        self.target
    }

    pub fn has_follow_up(&self) -> bool {
        self.follow_up.is_some()
    }

    pub fn follow_up(&self) -> Option<&str> {
        self.follow_up.as_deref()
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn item_count(&self) -> i32 {
        self.item_count
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn npc_id(&self) -> Option<CharacterId> {
        self.npc_id
    }

    pub fn is_assigned(&self) -> bool {
        self.player_id.is_some()
    }

    pub fn assigned_player_id(&self) -> Option<CharacterId> {
        self.player_id
    }
}
