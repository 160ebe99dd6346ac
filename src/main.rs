//! mission-sim
//!
//! Loads mission templates, hands one out in an in-memory world and plays it
//! through to the end, logging every transition.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mission_engine::mission::api::Attitude;
use mission_engine::mission::{
    CharacterId, CreatureDeath, GoalKind, MissionEvent, MissionHolder, MissionId, MissionOrigin,
    SequentialIds, TemplateRegistry, Tripoint, WorldMissions, WorldView,
};
use mission_engine::sandbox::{SandboxCharacter, SandboxWorld};
use mission_engine::{MissionConfig, MissionError, Result};

const DEFAULT_CONFIG: &str = "missions.toml";
const PLAYER: CharacterId = CharacterId(1);
const GIVER: CharacterId = CharacterId(100);
const TARGET: CharacterId = CharacterId(101);
/// Turns idled between accepting a mission and working on it
const IDLE_TURNS: u64 = 3;

// ============================================================================
// Goal Drivers
// ============================================================================

/// Make the sandbox satisfy the goal of mission `id`, the way a player would.
fn work_on(
    missions: &mut WorldMissions,
    id: MissionId,
    goal: GoalKind,
    player: &mut SandboxCharacter,
    world: &mut SandboxWorld,
) {
    let Some(mission) = missions.find(id) else {
        return;
    };
    let target = mission.target();
    let target_npc = mission.target_npc_id;
    let item = mission.item_id().map(str::to_string);
    let item_count = mission.item_count();
    let recruit_class = mission.recruit_class.clone();
    let monster_type = mission.monster_type.clone();
    let kill_goal = mission.monster_kill_goal;

    match goal {
        GoalKind::GoTo => {
            if let Some(target) = target {
                player.set_location(target);
            }
        }
        GoalKind::GoToType => {
            let template = missions.template_of(mission);
            if let Some(location_type) = template.and_then(|t| t.target_location_type.clone()) {
                world.set_location_type(player.location(), &location_type);
            }
        }
        GoalKind::FindItem => {
            if let Some(item) = item {
                player.give_item(&item, item_count);
            }
        }
        GoalKind::FindAnyItem => player.give_mission_item(id),
        GoalKind::FindMonster => {
            world.add_monster(monster_type.as_deref().unwrap_or("mon_dog"), Some(id));
        }
        GoalKind::KillMonster => {
            world.add_monster(monster_type.as_deref().unwrap_or("mon_bear"), Some(id));
            if world.remove_mission_monster(id) {
                let event = MissionEvent::CreatureDied(CreatureDeath::monster(Some(id)));
                missions.handle_event(&event, player, &*world);
            }
        }
        GoalKind::Assassinate => {
            let victim = target_npc.unwrap_or(TARGET);
            world.remove_npc(victim);
            let event = MissionEvent::CreatureDied(CreatureDeath::npc(victim));
            missions.handle_event(&event, player, &*world);
        }
        GoalKind::RecruitNpc => {
            if let Some(npc) = target_npc {
                world.set_attitude(npc, Attitude::Following);
            }
        }
        GoalKind::RecruitNpcClass => {
            let class = recruit_class.unwrap_or_else(|| "survivor".to_string());
            let recruit = CharacterId(TARGET.0 + 1);
            world.add_npc(recruit, &class, player.location());
            world.set_attitude(recruit, Attitude::Following);
        }
        GoalKind::KillMonsterType => {
            if let Some(monster_type) = monster_type {
                for _ in 0..kill_goal.max(0) {
                    world.record_kill(&monster_type);
                }
            }
        }
        GoalKind::ComputerToggle => missions.step_complete(id, 1, &*world),
        GoalKind::FindNpc | GoalKind::Null => {}
    }
}

// ============================================================================
// Main
// ============================================================================

fn run() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = MissionConfig::load(&config_path)?;

    let mut registry = TemplateRegistry::new();
    let loaded = registry.load_from_directory(&config.missions_dir())?;
    if loaded == 0 {
        warn!("No mission templates found under {:?}", config.missions_dir());
        return Ok(());
    }
    let mut missions = WorldMissions::with_config(Arc::new(registry), &config);

    let mut world = SandboxWorld::new();
    world.add_npc(GIVER, "merchant", Tripoint::new(3, 0, 0));
    world.add_npc(TARGET, "bandit", Tripoint::new(30, -12, 0));
    let mut player = SandboxCharacter::new(PLAYER);
    let mut ids = SequentialIds::new();

    let Some(id) = missions
        .reserve_random(MissionOrigin::AnyNpc, &player.location(), Some(GIVER), &mut ids, &world)
        .map(|m| m.id())
    else {
        info!("No mission on offer at {}", player.location());
        return Ok(());
    };

    if let Some(offer) = missions.dialogue_for_topic(id, "TALK_MISSION_OFFER") {
        info!("{}: \"{}\"", missions.name(id), offer);
    }
    missions.assign(id, &mut player);

    for _ in 0..IDLE_TURNS {
        world.advance(1);
        missions.handle_event(&MissionEvent::TurnAdvanced, &mut player, &world);
    }

    let goal = match missions.find(id).and_then(|m| missions.template_of(m)) {
        Some(template) => template.goal,
        None => GoalKind::Null,
    };
    work_on(&mut missions, id, goal, &mut player, &mut world);

    // A report-back goal sends the player back to the giver
    if let Some(target) = missions.find(id).and_then(|m| m.target()) {
        player.set_location(target);
    }

    world.advance(1);
    missions.handle_event(&MissionEvent::TurnAdvanced, &mut player, &world);

    if missions.is_complete(id, GIVER, &player, &world) {
        missions.wrap_up(id, &mut player);
    } else {
        missions.fail(id, &mut player);
    }

    if let Some(mission) = missions.find(id) {
        info!(
            "Mission {} '{}' finished as {} on turn {}",
            id,
            missions.name(id),
            mission.status(),
            world.turn()
        );
    }
    info!(
        "Player {} completed {:?}, failed {:?}",
        player.character_id(),
        player.completed_missions(),
        player.failed_missions()
    );

    if let Some(path) = &config.snapshot_path {
        let json = missions.to_json()?;
        std::fs::write(path, json).map_err(|source| MissionError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote snapshot to {:?}", path);
    }

    Ok(())
}

fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mission_engine=info,mission_sim=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        error!("mission-sim failed: {}", e);
        std::process::exit(1);
    }
}
