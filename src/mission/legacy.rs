//! Legacy Save Format
//!
//! Old saves store a mission as one line of whitespace-separated tokens.
//! Field order is fixed, and the free-text description is terminated by a
//! lone `<>` token:
//!
//! ```text
//! type_id description... <> failed value reward_type reward_favor reward_item
//! reward_skill uid target_x target_y item_id item_count deadline npc_id
//! good_faction bad_faction step follow_up target_npc_id
//! ```

use std::str::{FromStr, SplitWhitespace};

use tracing::warn;

use super::api::{CharacterId, MissionId, Tick, Tripoint};
use super::registry::TemplateRegistry;
use super::state::{Mission, MissionReward};
use crate::error::{MissionError, Result};

const DESCRIPTION_END: &str = "<>";
const NULL_ITEM: &str = "null";
/// Marker for an unset target; either coordinate carrying it means no target
const INVALID_COORD: i32 = i32::MIN;

/// Reads missions out of a legacy token stream
pub struct LegacyMissionReader<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> LegacyMissionReader<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            tokens: data.split_whitespace(),
        }
    }

    fn token(&mut self, field: &'static str) -> Result<&'a str> {
        self.tokens.next().ok_or(MissionError::UnexpectedEnd { field })
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T> {
        let token = self.token(field)?;
        token.parse().map_err(|_| MissionError::BadToken {
            field,
            token: token.to_string(),
        })
    }

    fn flag(&mut self, field: &'static str) -> Result<bool> {
        match self.token(field)? {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(MissionError::BadToken {
                field,
                token: other.to_string(),
            }),
        }
    }

    fn description(&mut self) -> Result<String> {
        let mut words = Vec::new();
        loop {
            let word = self.token("description")?;
            if word == DESCRIPTION_END {
                return Ok(words.join(" "));
            }
            words.push(word);
        }
    }

    /// Read the next mission. Template ids are resolved through `templates`.
    pub fn read_mission(&mut self, templates: &TemplateRegistry) -> Result<Mission> {
        let type_id: i32 = self.parse("type_id")?;
        let description = self.description()?;
        // Not used by anything this old
        let _failed = self.flag("failed")?;
        let value: i64 = self.parse("value")?;
        let _reward_type: i32 = self.parse("reward_type")?;
        let favor_type: i32 = self.parse("reward_favor")?;
        let reward_item: String = self.parse("reward_item")?;
        let skill: i32 = self.parse("reward_skill")?;
        let uid: u32 = self.parse("uid")?;
        let target_x: i32 = self.parse("target_x")?;
        let target_y: i32 = self.parse("target_y")?;
        let item_id: String = self.parse("item_id")?;
        let item_count: i32 = self.parse("item_count")?;
        let deadline: i64 = self.parse("deadline")?;
        let npc_id: i64 = self.parse("npc_id")?;
        let good_faction: i32 = self.parse("good_faction")?;
        let bad_faction: i32 = self.parse("bad_faction")?;
        let step: i32 = self.parse("step")?;
        let follow_up: i32 = self.parse("follow_up")?;
        let target_npc_id: i64 = self.parse("target_npc_id")?;

        let template_id = templates.from_legacy(type_id).unwrap_or_else(|| {
            warn!("Legacy mission {} has unknown type {}", uid, type_id);
            NULL_ITEM.to_string()
        });

        let mut mission = Mission::blank(MissionId(uid), &template_id);
        mission.description = description;
        mission.value = value;
        mission.reward = MissionReward {
            favor_type,
            item_id: non_null_item(reward_item),
            skill,
        };
        if target_x != INVALID_COORD && target_y != INVALID_COORD {
            mission.target = Some(Tripoint::new(target_x, target_y, 0));
        }
        mission.item_id = non_null_item(item_id);
        mission.item_count = item_count;
        mission.deadline = (deadline > 0).then_some(deadline as Tick);
        mission.npc_id = character(npc_id);
        mission.good_faction_id = (good_faction >= 0).then_some(good_faction);
        mission.bad_faction_id = (bad_faction >= 0).then_some(bad_faction);
        mission.step = step;
        mission.follow_up = templates.from_legacy(follow_up);
        mission.target_npc_id = character(target_npc_id);
        Ok(mission)
    }
}

fn non_null_item(id: String) -> Option<String> {
    (id != NULL_ITEM).then_some(id)
}

fn character(id: i64) -> Option<CharacterId> {
    u32::try_from(id).ok().map(CharacterId)
}

fn character_token(id: Option<CharacterId>) -> i64 {
    id.map_or(-1, |c| i64::from(c.0))
}

/// Write a mission in the legacy token format, on a single line.
pub fn write_mission(mission: &Mission, templates: &TemplateRegistry) -> String {
    let target = mission
        .target
        .map_or((INVALID_COORD, INVALID_COORD), |t| (t.x, t.y));
    let description = if mission.description.is_empty() {
        DESCRIPTION_END.to_string()
    } else {
        format!("{} {}", mission.description, DESCRIPTION_END)
    };
    let follow_up = mission
        .follow_up
        .as_deref()
        .map_or(0, |id| templates.to_legacy(id));

    let fields: [String; 20] = [
        templates.to_legacy(&mission.template_id).to_string(),
        description,
        u8::from(mission.has_failed()).to_string(),
        mission.value.to_string(),
        "0".to_string(),
        mission.reward.favor_type.to_string(),
        mission.reward.item_id.clone().unwrap_or_else(|| NULL_ITEM.to_string()),
        mission.reward.skill.to_string(),
        mission.uid.0.to_string(),
        target.0.to_string(),
        target.1.to_string(),
        mission.item_id.clone().unwrap_or_else(|| NULL_ITEM.to_string()),
        mission.item_count.to_string(),
        mission.deadline.unwrap_or(0).to_string(),
        character_token(mission.npc_id).to_string(),
        mission.good_faction_id.unwrap_or(-1).to_string(),
        mission.bad_faction_id.unwrap_or(-1).to_string(),
        mission.step.to_string(),
        follow_up.to_string(),
        character_token(mission.target_npc_id).to_string(),
    ];
    fields.join(" ")
}
