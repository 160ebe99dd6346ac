//! Mission Template Registry
//!
//! Loads and holds mission templates from TOML files. Built once at world
//! load, then shared read-only (usually behind an `Arc`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use super::api::Tripoint;
use super::definition::{
    MissionFn, MissionHooks, MissionOrigin, MissionTemplate, PlaceFn, RawMissionFile, RawMissionTemplate,
};
use super::state::Mission;
use crate::error::{MissionError, Result};

/// Named hooks that template files can refer to
pub struct HookTable {
    places: HashMap<String, PlaceFn>,
    actions: HashMap<String, MissionFn>,
}

impl HookTable {
    /// Table with only the built-in hooks.
    pub fn new() -> Self {
        let mut table = Self {
            places: HashMap::new(),
            actions: HashMap::new(),
        };
        table.register_place("always", |_| true);
        table.register_place("surface_only", |p| p.z == 0);
        table.register_place("underground_only", |p| p.z < 0);
        table.register_action("standard", |_| {});
        table
    }

    pub fn register_place<F>(&mut self, name: &str, place: F)
    where
        F: Fn(&Tripoint) -> bool + Send + Sync + 'static,
    {
        self.places.insert(name.to_string(), Arc::new(place));
    }

    /// Register a start/end/fail side effect.
    pub fn register_action<F>(&mut self, name: &str, action: F)
    where
        F: Fn(&mut Mission) + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(action));
    }

    /// Resolve the hook names of a raw template. Unknown names fall back to the defaults.
    pub fn resolve(&self, raw: &RawMissionTemplate) -> MissionHooks {
        let defaults = MissionHooks::default();

        let place = match raw.place.as_deref() {
            Some(name) => self.places.get(name).cloned().unwrap_or_else(|| {
                warn!("Mission '{}' uses unknown place hook '{}'", raw.id, name);
                defaults.place.clone()
            }),
            None => defaults.place.clone(),
        };

        let action = |name: Option<&str>, fallback: &MissionFn| match name {
            Some(name) => self.actions.get(name).cloned().unwrap_or_else(|| {
                warn!("Mission '{}' uses unknown hook '{}'", raw.id, name);
                fallback.clone()
            }),
            None => fallback.clone(),
        };

        MissionHooks {
            place,
            start: action(raw.start.as_deref(), &defaults.start),
            end: action(raw.end.as_deref(), &defaults.end),
            fail: action(raw.fail.as_deref(), &defaults.fail),
        }
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry for all mission templates
pub struct TemplateRegistry {
    /// Registration order; the first entry is the fallback template
    templates: Vec<Arc<MissionTemplate>>,
    /// Template id -> position in `templates`
    index: HashMap<String, usize>,
    hooks: HookTable,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::with_hooks(HookTable::new())
    }

    pub fn with_hooks(hooks: HookTable) -> Self {
        Self {
            templates: Vec::new(),
            index: HashMap::new(),
            hooks,
        }
    }

    pub fn hooks_mut(&mut self) -> &mut HookTable {
        &mut self.hooks
    }

    /// Load every `.toml` file below `missions_dir`. Returns the number of templates loaded.
    pub fn load_from_directory(&mut self, missions_dir: &Path) -> Result<usize> {
        info!("Loading mission templates from {:?}", missions_dir);

        if !missions_dir.exists() {
            warn!("Mission directory does not exist: {:?}", missions_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_toml_files(missions_dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(loaded) => count += loaded,
                Err(e) => warn!("Failed to load mission file {:?}: {}", path, e),
            }
        }
        info!("Loaded {} mission templates", count);

        self.validate_follow_ups();
        Ok(count)
    }

    /// Load a single template file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|source| MissionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: RawMissionFile = toml::from_str(&content).map_err(|source| MissionError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        // Validate the whole file before registering any of it
        let templates = raw
            .mission
            .iter()
            .map(|raw| MissionTemplate::from_raw(raw, self.hooks.resolve(raw)))
            .collect::<Result<Vec<_>>>()?;

        let count = templates.len();
        for template in templates {
            info!("Loaded mission template: {} ({})", template.name, template.id);
            self.register(template);
        }
        Ok(count)
    }

    /// Add a template. A template with the same id is replaced in place.
    pub fn register(&mut self, template: MissionTemplate) {
        let template = Arc::new(template);
        match self.index.get(&template.id) {
            Some(&pos) => {
                warn!("Duplicate mission template id '{}', overwriting", template.id);
                self.templates[pos] = template;
            }
            None => {
                self.index.insert(template.id.clone(), self.templates.len());
                self.templates.push(template);
            }
        }
    }

    /// Warn about follow-ups that name no loaded template
    fn validate_follow_ups(&self) {
        for template in &self.templates {
            if let Some(ref next) = template.follow_up {
                if !self.index.contains_key(next) {
                    warn!(
                        "Mission template '{}' references non-existent follow-up '{}'",
                        template.id, next
                    );
                }
            }
        }
    }

    /// Get a template by id
    pub fn get(&self, id: &str) -> Option<Arc<MissionTemplate>> {
        self.index.get(id).map(|&pos| Arc::clone(&self.templates[pos]))
    }

    /// Get a template by id, degrading to the first registered template when it is unknown.
    pub fn get_or_first(&self, id: &str) -> Option<Arc<MissionTemplate>> {
        if let Some(template) = self.get(id) {
            return Some(template);
        }
        warn!("Unknown mission template '{}', using first registered template", id);
        let first = self.templates.first().cloned();
        if first.is_none() {
            error!("No mission templates registered");
        }
        first
    }

    /// Template id for a numeric id from old saves
    pub fn from_legacy(&self, legacy_id: i32) -> Option<String> {
        self.templates
            .iter()
            .find(|t| t.legacy_id == Some(legacy_id))
            .map(|t| t.id.clone())
    }

    /// Numeric legacy id of a template, 0 when it has none.
    pub fn to_legacy(&self, id: &str) -> i32 {
        self.get(id).and_then(|t| t.legacy_id).unwrap_or(0)
    }

    /// Pick a template uniformly among those eligible for `origin` at `location`.
    pub fn get_random_id<R: Rng + ?Sized>(
        &self,
        origin: MissionOrigin,
        location: &Tripoint,
        rng: &mut R,
    ) -> Option<String> {
        let eligible: Vec<&Arc<MissionTemplate>> = self
            .templates
            .iter()
            .filter(|t| t.is_eligible(origin, location))
            .collect();

        eligible.choose(rng).map(|t| t.id.clone())
    }

    /// All templates in registration order
    pub fn get_all(&self) -> impl Iterator<Item = &Arc<MissionTemplate>> {
        self.templates.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source: std::io::Error| MissionError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::definition::GoalKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn create_test_mission_toml() -> &'static str {
        r#"
[[mission]]
id = "MISSION_GET_WATER"
name = "Find Clean Water"
goal = "find_item"
value = 800
origins = ["any_npc", "opener_npc"]
item_id = "water_clean"
item_count = 3
follow_up = "MISSION_MISSING"
legacy_id = 2
start = "standard"

[mission.dialogue]
offer = "I need some clean water."

[[mission]]
id = "MISSION_REACH_BUNKER"
name = "Reach the Bunker"
goal = "go_to"
origins = ["radio_tower"]
place = "underground_only"
deadline_low = 100
deadline_high = 200
"#
    }

    fn write_missions(content: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let missions_dir = temp_dir.path().join("missions").join("core");
        std::fs::create_dir_all(&missions_dir).unwrap();
        std::fs::write(missions_dir.join("core.toml"), content).unwrap();
        temp_dir
    }

    #[test]
    fn test_load_templates() {
        let temp_dir = write_missions(create_test_mission_toml());
        let mut registry = TemplateRegistry::new();
        let count = registry.load_from_directory(&temp_dir.path().join("missions")).unwrap();
        assert_eq!(count, 2);

        let water = registry.get("MISSION_GET_WATER").unwrap();
        assert_eq!(water.goal, GoalKind::FindItem);
        assert_eq!(water.item_count, 3);
        assert_eq!(water.origins, vec![MissionOrigin::AnyNpc, MissionOrigin::OpenerNpc]);
        assert_eq!(water.dialogue_for_topic("TALK_MISSION_OFFER"), "I need some clean water.");

        let bunker = registry.get("MISSION_REACH_BUNKER").unwrap();
        assert!((bunker.hooks.place)(&Tripoint::new(0, 0, -1)));
        assert!(!(bunker.hooks.place)(&Tripoint::new(0, 0, 0)));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = TemplateRegistry::new();
        assert_eq!(registry.load_from_directory(&temp_dir.path().join("nope")).unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_file_is_skipped() {
        let temp_dir = write_missions(create_test_mission_toml());
        std::fs::write(temp_dir.path().join("missions").join("broken.toml"), "[[mission]]\nid = 3").unwrap();

        let mut registry = TemplateRegistry::new();
        let count = registry.load_from_directory(&temp_dir.path().join("missions")).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_duplicate_overwrites_in_place() {
        let mut registry = TemplateRegistry::new();
        registry.register(MissionTemplate::new("A", "First", GoalKind::GoTo));
        registry.register(MissionTemplate::new("B", "Second", GoalKind::GoTo));
        registry.register(MissionTemplate::new("A", "Replaced", GoalKind::FindNpc));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("A").unwrap().name, "Replaced");
        assert_eq!(registry.get_all().next().unwrap().id, "A");
    }

    #[test]
    fn test_get_or_first_falls_back() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.get_or_first("X").is_none());

        registry.register(MissionTemplate::new("A", "First", GoalKind::GoTo));
        registry.register(MissionTemplate::new("B", "Second", GoalKind::GoTo));
        assert_eq!(registry.get_or_first("B").unwrap().id, "B");
        assert_eq!(registry.get_or_first("X").unwrap().id, "A");
    }

    #[test]
    fn test_legacy_lookup() {
        let temp_dir = write_missions(create_test_mission_toml());
        let mut registry = TemplateRegistry::new();
        registry.load_from_directory(&temp_dir.path().join("missions")).unwrap();

        assert_eq!(registry.from_legacy(2).as_deref(), Some("MISSION_GET_WATER"));
        assert_eq!(registry.from_legacy(99), None);
        assert_eq!(registry.to_legacy("MISSION_GET_WATER"), 2);
        assert_eq!(registry.to_legacy("MISSION_REACH_BUNKER"), 0);
    }

    #[test]
    fn test_random_selection_filters() {
        let temp_dir = write_missions(create_test_mission_toml());
        let mut registry = TemplateRegistry::new();
        registry.load_from_directory(&temp_dir.path().join("missions")).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let surface = Tripoint::new(5, 5, 0);
        for _ in 0..10 {
            assert_eq!(
                registry.get_random_id(MissionOrigin::AnyNpc, &surface, &mut rng).as_deref(),
                Some("MISSION_GET_WATER")
            );
        }

        // Radio tower template only places underground
        assert_eq!(registry.get_random_id(MissionOrigin::RadioTower, &surface, &mut rng), None);
        assert_eq!(
            registry
                .get_random_id(MissionOrigin::RadioTower, &Tripoint::new(5, 5, -1), &mut rng)
                .as_deref(),
            Some("MISSION_REACH_BUNKER")
        );
        assert_eq!(registry.get_random_id(MissionOrigin::Computer, &surface, &mut rng), None);
    }

    #[test]
    fn test_unknown_hook_falls_back() {
        let raw: RawMissionTemplate = toml::from_str(
            r#"
id = "MISSION_ODD"
name = "Odd"
goal = "go_to"
place = "on_the_moon"
"#,
        )
        .unwrap();
        let hooks = HookTable::new().resolve(&raw);
        assert!((hooks.place)(&Tripoint::new(1, 2, 3)));
    }
}
