//! Creature roster: the model, its repository, and the two screens.

pub mod add_creature;
pub mod all_creatures;
pub mod model;
pub mod repository;

pub use add_creature::{AddCreature, AddCreatureIntent, AddCreatureProcessor, AddCreatureState};
pub use all_creatures::{AllCreatures, AllCreaturesIntent, AllCreaturesProcessor, AllCreaturesState};
pub use model::{Attribute, Creature, CreatureAttributes, CreatureGenerator};
pub use repository::{CreatureRepository, InMemoryCreatureRepository, JsonFileCreatureRepository};
