//! Mission System Module
//!
//! Data-driven mission lifecycle: templates authored in TOML, per-world
//! instances that move through a small state machine, a pure completion
//! predicate, and hooks the host calls when creatures die or time passes.

pub mod api;
pub mod definition;
pub mod events;
pub mod goal;
pub mod legacy;
pub mod registry;
pub mod state;
pub mod world;

pub use api::{CharacterId, IdAllocator, MissionHolder, MissionId, SequentialIds, Tick, Tripoint, WorldView};
pub use definition::{GoalKind, MissionHooks, MissionOrigin, MissionTemplate};
pub use events::{CreatureDeath, CreatureKind, MissionEvent};
pub use goal::GoalEvaluator;
pub use legacy::LegacyMissionReader;
pub use registry::{HookTable, TemplateRegistry};
pub use state::{Mission, MissionReward, MissionStatus};
pub use world::WorldMissions;
