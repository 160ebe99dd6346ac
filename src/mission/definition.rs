//! Mission Template Definitions
//!
//! Templates are deserialized from TOML, resolved against a hook table, and
//! never mutated afterwards. Instances reference them by id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::api::{CharacterId, IdAllocator, Tick, Tripoint};
use super::state::Mission;
use crate::error::{MissionError, Result};

/// A TOML file holding any number of templates
#[derive(Debug, Clone, Deserialize)]
pub struct RawMissionFile {
    #[serde(default)]
    pub mission: Vec<RawMissionTemplate>,
}

/// Raw template data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawMissionTemplate {
    pub id: String,
    pub name: String,
    pub goal: String,
    #[serde(default)]
    pub difficulty: i32,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub origins: Vec<String>,
    pub item_id: Option<String>,
    #[serde(default = "default_count")]
    pub item_count: i32,
    pub target_location_type: Option<String>,
    pub recruit_class: Option<String>,
    pub monster_type: Option<String>,
    #[serde(default = "default_count")]
    pub monster_kill_goal: i32,
    #[serde(default)]
    pub deadline_low: Tick,
    #[serde(default)]
    pub deadline_high: Tick,
    pub follow_up: Option<String>,
    /// Numeric id used by old saves
    pub legacy_id: Option<i32>,
    /// Hook names, resolved through the registry's hook table
    pub place: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub fail: Option<String>,
    /// Topic -> text
    #[serde(default)]
    pub dialogue: HashMap<String, String>,
}

fn default_count() -> i32 {
    1
}

// ============================================================================
// Resolved Template Structures
// ============================================================================

/// Goal kinds supported by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Reach the mission's target location
    GoTo,
    /// Reach any location of the template's target type
    GoToType,
    /// Bring a specific item in a specific quantity
    FindItem,
    /// Bring any item tagged for this mission
    FindAnyItem,
    /// Find a monster tagged for this mission (and keep it alive)
    FindMonster,
    /// Talk to the originator
    FindNpc,
    /// Kill the target NPC
    Assassinate,
    /// Kill a monster tagged for this mission
    KillMonster,
    /// Kill a number of monsters of one type
    KillMonsterType,
    /// Recruit the target NPC
    RecruitNpc,
    /// Recruit any NPC of a class
    RecruitNpcClass,
    /// Flip a world object (set externally)
    ComputerToggle,
    /// Unrecognized goal; never completes
    Null,
}

impl GoalKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "go_to" => Some(GoalKind::GoTo),
            "go_to_type" => Some(GoalKind::GoToType),
            "find_item" => Some(GoalKind::FindItem),
            "find_any_item" => Some(GoalKind::FindAnyItem),
            "find_monster" => Some(GoalKind::FindMonster),
            "find_npc" => Some(GoalKind::FindNpc),
            "assassinate" => Some(GoalKind::Assassinate),
            "kill_monster" => Some(GoalKind::KillMonster),
            "kill_monster_type" => Some(GoalKind::KillMonsterType),
            "recruit_npc" => Some(GoalKind::RecruitNpc),
            "recruit_npc_class" => Some(GoalKind::RecruitNpcClass),
            "computer_toggle" => Some(GoalKind::ComputerToggle),
            "null" => Some(GoalKind::Null),
            _ => None,
        }
    }

    /// Goals whose completion has to be reported back to the originator.
    pub fn reports_back(&self) -> bool {
        matches!(
            self,
            GoalKind::FindItem | GoalKind::FindMonster | GoalKind::Assassinate | GoalKind::KillMonster
        )
    }
}

/// Who or what hands a mission out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOrigin {
    GameStart,
    OpenerNpc,
    AnyNpc,
    Secondary,
    Computer,
    RadioTower,
}

impl MissionOrigin {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "game_start" => Some(MissionOrigin::GameStart),
            "opener_npc" => Some(MissionOrigin::OpenerNpc),
            "any_npc" => Some(MissionOrigin::AnyNpc),
            "secondary" => Some(MissionOrigin::Secondary),
            "computer" => Some(MissionOrigin::Computer),
            "radio_tower" => Some(MissionOrigin::RadioTower),
            _ => None,
        }
    }
}

/// Placement predicate: may this template be offered at a location?
pub type PlaceFn = Arc<dyn Fn(&Tripoint) -> bool + Send + Sync>;

/// Side effect run on an instance at start, end or failure.
pub type MissionFn = Arc<dyn Fn(&mut Mission) + Send + Sync>;

/// Behavioral hooks attached to a template
#[derive(Clone)]
pub struct MissionHooks {
    pub place: PlaceFn,
    pub start: MissionFn,
    pub end: MissionFn,
    pub fail: MissionFn,
}

impl Default for MissionHooks {
    fn default() -> Self {
        Self {
            place: Arc::new(|_: &Tripoint| true),
            start: Arc::new(|_: &mut Mission| {}),
            end: Arc::new(|_: &mut Mission| {}),
            fail: Arc::new(|_: &mut Mission| {}),
        }
    }
}

impl fmt::Debug for MissionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MissionHooks { .. }")
    }
}

/// Internal dialogue keys are ugly; map them to the short topic names used in data files.
const TOPIC_ALIASES: &[(&str, &str)] = &[
    ("TALK_MISSION_DESCRIBE", "describe"),
    ("TALK_MISSION_OFFER", "offer"),
    ("TALK_MISSION_ACCEPTED", "accepted"),
    ("TALK_MISSION_REJECTED", "rejected"),
    ("TALK_MISSION_ADVICE", "advice"),
    ("TALK_MISSION_INQUIRE", "inquire"),
    ("TALK_MISSION_SUCCESS", "success"),
    ("TALK_MISSION_SUCCESS_LIE", "success_lie"),
    ("TALK_MISSION_FAILURE", "failure"),
];

/// A fully resolved mission template
#[derive(Debug, Clone)]
pub struct MissionTemplate {
    pub id: String,
    pub name: String,
    pub goal: GoalKind,
    pub difficulty: i32,
    /// Base monetary value
    pub value: i64,
    pub urgent: bool,
    /// Origins this template can be handed out from
    pub origins: Vec<MissionOrigin>,
    pub item_id: Option<String>,
    pub item_count: i32,
    /// Location type for go-to-type goals
    pub target_location_type: Option<String>,
    pub recruit_class: Option<String>,
    pub monster_type: Option<String>,
    pub monster_kill_goal: i32,
    /// Deadline roll bounds, in turns from creation
    pub deadline_low: Tick,
    pub deadline_high: Tick,
    pub follow_up: Option<String>,
    pub legacy_id: Option<i32>,
    pub dialogue: HashMap<String, String>,
    pub hooks: MissionHooks,
}

impl MissionTemplate {
    /// A bare template with default hooks, for programmatic registration.
    pub fn new(id: &str, name: &str, goal: GoalKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            goal,
            difficulty: 0,
            value: 0,
            urgent: false,
            origins: Vec::new(),
            item_id: None,
            item_count: 1,
            target_location_type: None,
            recruit_class: None,
            monster_type: None,
            monster_kill_goal: 1,
            deadline_low: 0,
            deadline_high: 0,
            follow_up: None,
            legacy_id: None,
            dialogue: HashMap::new(),
            hooks: MissionHooks::default(),
        }
    }

    /// Create a template from raw TOML data and already-resolved hooks
    pub fn from_raw(raw: &RawMissionTemplate, hooks: MissionHooks) -> Result<Self> {
        let invalid = |reason: String| MissionError::InvalidTemplate {
            id: raw.id.clone(),
            reason,
        };

        if raw.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }

        let goal = GoalKind::from_str(&raw.goal).unwrap_or_else(|| {
            warn!("Mission '{}' has unknown goal '{}', it will never complete", raw.id, raw.goal);
            GoalKind::Null
        });

        let origins = raw
            .origins
            .iter()
            .map(|o| MissionOrigin::from_str(o).ok_or_else(|| invalid(format!("unknown origin '{}'", o))))
            .collect::<Result<Vec<_>>>()?;

        // 0 is the "none" token in old saves
        if let Some(legacy_id) = raw.legacy_id.filter(|id| *id <= 0) {
            return Err(invalid(format!("legacy_id must be positive, got {}", legacy_id)));
        }

        if raw.deadline_low > raw.deadline_high {
            return Err(invalid(format!(
                "deadline_low {} exceeds deadline_high {}",
                raw.deadline_low, raw.deadline_high
            )));
        }

        match goal {
            GoalKind::FindItem if raw.item_id.is_none() => {
                return Err(invalid("find_item goal needs item_id".to_string()));
            }
            GoalKind::GoToType if raw.target_location_type.is_none() => {
                return Err(invalid("go_to_type goal needs target_location_type".to_string()));
            }
            GoalKind::KillMonsterType if raw.monster_type.is_none() => {
                return Err(invalid("kill_monster_type goal needs monster_type".to_string()));
            }
            _ => {}
        }

        Ok(Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            goal,
            difficulty: raw.difficulty,
            value: raw.value,
            urgent: raw.urgent,
            origins,
            item_id: raw.item_id.clone(),
            item_count: raw.item_count,
            target_location_type: raw.target_location_type.clone(),
            recruit_class: raw.recruit_class.clone(),
            monster_type: raw.monster_type.clone(),
            monster_kill_goal: raw.monster_kill_goal,
            deadline_low: raw.deadline_low,
            deadline_high: raw.deadline_high,
            follow_up: raw.follow_up.clone(),
            legacy_id: raw.legacy_id,
            dialogue: raw.dialogue.clone(),
            hooks,
        })
    }

    /// Build a new, unregistered instance of this template.
    pub fn create<R: Rng + ?Sized>(
        &self,
        npc_id: Option<CharacterId>,
        ids: &mut dyn IdAllocator,
        now: Tick,
        rng: &mut R,
    ) -> Mission {
        let mut mission = Mission::from_template(ids.next_mission_id(), self, npc_id);

        if self.deadline_low != 0 || self.deadline_high != 0 {
            let low = self.deadline_low.min(self.deadline_high);
            let high = self.deadline_low.max(self.deadline_high);
            mission.deadline = Some(now + rng.gen_range(low..=high));
        }

        mission
    }

    /// Can this template be handed out from `origin` at `location`?
    pub fn is_eligible(&self, origin: MissionOrigin, location: &Tripoint) -> bool {
        self.origins.contains(&origin) && (self.hooks.place)(location)
    }

    pub fn has_follow_up(&self) -> bool {
        self.follow_up.is_some()
    }

    /// Text for a dialogue topic, or a placeholder naming what is missing.
    pub fn dialogue_for_topic(&self, topic: &str) -> String {
        let topic = TOPIC_ALIASES
            .iter()
            .find(|(key, _)| *key == topic)
            .map(|(_, short)| *short)
            .unwrap_or(topic);

        match self.dialogue.get(topic) {
            Some(text) => text.clone(),
            None => format!(
                "Someone forgot to code this message id is {}, topic is {}!",
                self.id, topic
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::api::MissionId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Counter(u32);

    impl IdAllocator for Counter {
        fn next_mission_id(&mut self) -> MissionId {
            self.0 += 1;
            MissionId(self.0)
        }
    }

    fn raw(goal: &str) -> RawMissionTemplate {
        toml::from_str(&format!(
            r#"
id = "MISSION_TEST"
name = "Test"
goal = "{}"
item_id = "water_clean"
item_count = 3
origins = ["any_npc"]
"#,
            goal
        ))
        .unwrap()
    }

    #[test]
    fn test_goal_kind_parsing() {
        assert_eq!(GoalKind::from_str("find_item"), Some(GoalKind::FindItem));
        assert_eq!(GoalKind::from_str("ASSASSINATE"), Some(GoalKind::Assassinate));
        assert_eq!(GoalKind::from_str("computer_toggle"), Some(GoalKind::ComputerToggle));
        assert_eq!(GoalKind::from_str("dance"), None);
    }

    #[test]
    fn test_unknown_goal_resolves_to_null() {
        let template = MissionTemplate::from_raw(&raw("dance"), MissionHooks::default()).unwrap();
        assert_eq!(template.goal, GoalKind::Null);
    }

    #[test]
    fn test_unknown_origin_is_rejected() {
        let mut r = raw("find_item");
        r.origins.push("mailbox".to_string());
        assert!(MissionTemplate::from_raw(&r, MissionHooks::default()).is_err());
    }

    #[test]
    fn test_find_item_requires_item() {
        let mut r = raw("find_item");
        r.item_id = None;
        assert!(MissionTemplate::from_raw(&r, MissionHooks::default()).is_err());
    }

    #[test]
    fn test_non_positive_legacy_id_is_rejected() {
        let mut r = raw("find_item");
        for bad in [0, -3] {
            r.legacy_id = Some(bad);
            assert!(matches!(
                MissionTemplate::from_raw(&r, MissionHooks::default()),
                Err(MissionError::InvalidTemplate { .. })
            ));
        }
        r.legacy_id = Some(4);
        assert_eq!(MissionTemplate::from_raw(&r, MissionHooks::default()).unwrap().legacy_id, Some(4));
    }

    #[test]
    fn test_create_copies_fields_without_deadline() {
        let template = MissionTemplate::from_raw(&raw("find_item"), MissionHooks::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mission = template.create(Some(CharacterId(4)), &mut Counter(0), 500, &mut rng);

        assert_eq!(mission.id().0, 1);
        assert_eq!(mission.item_id(), Some("water_clean"));
        assert_eq!(mission.item_count(), 3);
        assert_eq!(mission.npc_id(), Some(CharacterId(4)));
        assert!(!mission.has_deadline());
    }

    #[test]
    fn test_create_rolls_deadline_in_range() {
        let mut template = MissionTemplate::new("MISSION_TIMED", "Timed", GoalKind::GoTo);
        template.deadline_low = 100;
        template.deadline_high = 200;
        let mut rng = StdRng::seed_from_u64(9);
        let mut ids = Counter(0);

        for _ in 0..20 {
            let mission = template.create(None, &mut ids, 1000, &mut rng);
            let deadline = mission.deadline().unwrap();
            assert!((1100..=1200).contains(&deadline));
        }
    }

    #[test]
    fn test_dialogue_aliases() {
        let mut template = MissionTemplate::new("MISSION_TALK", "Talk", GoalKind::FindNpc);
        template.dialogue.insert("offer".to_string(), "Could you help me?".to_string());

        assert_eq!(template.dialogue_for_topic("TALK_MISSION_OFFER"), "Could you help me?");
        assert_eq!(template.dialogue_for_topic("offer"), "Could you help me?");
        assert_eq!(
            template.dialogue_for_topic("TALK_MISSION_ADVICE"),
            "Someone forgot to code this message id is MISSION_TALK, topic is advice!"
        );
    }

    #[test]
    fn test_eligibility_checks_origin_and_place() {
        let mut template = MissionTemplate::new("MISSION_SURFACE", "Surface", GoalKind::GoTo);
        template.origins = vec![MissionOrigin::AnyNpc];
        template.hooks.place = Arc::new(|p: &Tripoint| p.z == 0);

        assert!(template.is_eligible(MissionOrigin::AnyNpc, &Tripoint::new(1, 1, 0)));
        assert!(!template.is_eligible(MissionOrigin::AnyNpc, &Tripoint::new(1, 1, -1)));
        assert!(!template.is_eligible(MissionOrigin::GameStart, &Tripoint::new(1, 1, 0)));
    }
}
