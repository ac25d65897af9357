use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::model::{Attribute, Creature, CreatureAttributes, CreatureGenerator};
use super::repository::CreatureRepository;
use crate::escape::is_blank;
use crate::mvi::{Mvi, Processor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddCreatureIntent {
    Avatar {
        drawable: u32,
    },
    Name {
        name: String,
    },
    Intelligence {
        index: usize,
    },
    Strength {
        index: usize,
    },
    Endurance {
        index: usize,
    },
    Save {
        drawable: u32,
        name: String,
        intelligence_index: usize,
        strength_index: usize,
        endurance_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddCreatureAction {
    Avatar(u32),
    Name(String),
    Intelligence(usize),
    Strength(usize),
    Endurance(usize),
    Save {
        drawable: u32,
        name: String,
        intelligence_index: usize,
        strength_index: usize,
        endurance_index: usize,
    },
}

/// Progress of a single add-creature action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Processing,
    Success(T),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddCreatureResult {
    Avatar(Step<u32>),
    Name(Step<String>),
    Intelligence(Step<u32>),
    Strength(Step<u32>),
    Endurance(Step<u32>),
    Save(Step<()>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCreatureState {
    pub is_processing: bool,
    pub creature: Creature,
    pub is_selected_drawable: bool,
    pub is_save_complete: bool,
    pub error: Option<String>,
}

impl Default for AddCreatureState {
    fn default() -> Self {
        Self {
            is_processing: false,
            creature: CreatureGenerator::new().generate(CreatureAttributes::default(), "", 0),
            is_selected_drawable: false,
            is_save_complete: false,
            error: None,
        }
    }
}

/// Creature editor screen.
pub struct AddCreature;

impl AddCreature {
    fn regenerate(
        state: &AddCreatureState,
        attributes: CreatureAttributes,
        name: &str,
        drawable: u32,
    ) -> AddCreatureState {
        AddCreatureState {
            is_processing: false,
            creature: CreatureGenerator::new().generate(attributes, name, drawable),
            error: None,
            ..state.clone()
        }
    }
}

fn step<T>(
    state: &AddCreatureState,
    step: Step<T>,
    on_success: impl FnOnce(T) -> AddCreatureState,
) -> AddCreatureState {
    match step {
        Step::Processing => AddCreatureState {
            is_processing: true,
            error: None,
            ..state.clone()
        },
        Step::Success(value) => on_success(value),
        Step::Failure(error) => AddCreatureState {
            is_processing: false,
            error: Some(error),
            ..state.clone()
        },
    }
}

impl Mvi for AddCreature {
    type Intent = AddCreatureIntent;
    type Action = AddCreatureAction;
    type Outcome = AddCreatureResult;
    type State = AddCreatureState;

    fn initial_state() -> AddCreatureState {
        AddCreatureState::default()
    }

    fn action_from_intent(intent: AddCreatureIntent) -> AddCreatureAction {
        match intent {
            AddCreatureIntent::Avatar { drawable } => AddCreatureAction::Avatar(drawable),
            AddCreatureIntent::Name { name } => AddCreatureAction::Name(name),
            AddCreatureIntent::Intelligence { index } => AddCreatureAction::Intelligence(index),
            AddCreatureIntent::Strength { index } => AddCreatureAction::Strength(index),
            AddCreatureIntent::Endurance { index } => AddCreatureAction::Endurance(index),
            AddCreatureIntent::Save {
                drawable,
                name,
                intelligence_index,
                strength_index,
                endurance_index,
            } => AddCreatureAction::Save {
                drawable,
                name,
                intelligence_index,
                strength_index,
                endurance_index,
            },
        }
    }

    fn reduce(state: &AddCreatureState, result: AddCreatureResult) -> AddCreatureState {
        let current = &state.creature;
        let attributes = current.attributes;
        match result {
            AddCreatureResult::Avatar(s) => step(state, s, |drawable| AddCreatureState {
                is_selected_drawable: drawable != 0,
                ..Self::regenerate(state, attributes, &current.name, drawable)
            }),
            AddCreatureResult::Name(s) => step(state, s, |name| {
                Self::regenerate(state, attributes, &name, current.drawable)
            }),
            AddCreatureResult::Intelligence(s) => step(state, s, |intelligence| {
                let attributes = CreatureAttributes {
                    intelligence,
                    ..attributes
                };
                Self::regenerate(state, attributes, &current.name, current.drawable)
            }),
            AddCreatureResult::Strength(s) => step(state, s, |strength| {
                let attributes = CreatureAttributes {
                    strength,
                    ..attributes
                };
                Self::regenerate(state, attributes, &current.name, current.drawable)
            }),
            AddCreatureResult::Endurance(s) => step(state, s, |endurance| {
                let attributes = CreatureAttributes {
                    endurance,
                    ..attributes
                };
                Self::regenerate(state, attributes, &current.name, current.drawable)
            }),
            AddCreatureResult::Save(s) => step(state, s, |()| AddCreatureState {
                is_processing: false,
                is_save_complete: true,
                error: None,
                ..state.clone()
            }),
        }
    }
}

pub struct AddCreatureProcessor {
    repository: Arc<dyn CreatureRepository>,
    generator: CreatureGenerator,
}

impl AddCreatureProcessor {
    pub fn new(repository: Arc<dyn CreatureRepository>) -> Self {
        Self {
            repository,
            generator: CreatureGenerator::new(),
        }
    }

    async fn save(
        &self,
        drawable: u32,
        name: &str,
        intelligence_index: usize,
        strength_index: usize,
        endurance_index: usize,
    ) -> Result<(), String> {
        if is_blank(name) {
            return Err("creature needs a name".to_string());
        }
        let attributes = CreatureAttributes::new(
            Attribute::Intelligence.value_at(intelligence_index)?,
            Attribute::Strength.value_at(strength_index)?,
            Attribute::Endurance.value_at(endurance_index)?,
        );
        let creature = self.generator.generate(attributes, name, drawable);
        self.repository
            .save_creature(creature)
            .await
            .map_err(|e| e.to_string())?;
        info!(name, "creature saved");
        Ok(())
    }
}

fn attribute_step(attribute: Attribute, index: usize) -> Step<u32> {
    match attribute.value_at(index) {
        Ok(value) => Step::Success(value),
        Err(e) => Step::Failure(e),
    }
}

#[async_trait]
impl Processor<AddCreature> for AddCreatureProcessor {
    async fn process(
        &self,
        action: AddCreatureAction,
        emit: &mut (dyn FnMut(AddCreatureResult) + Send),
    ) {
        match action {
            AddCreatureAction::Avatar(drawable) => {
                emit(AddCreatureResult::Avatar(Step::Processing));
                emit(AddCreatureResult::Avatar(Step::Success(drawable)));
            }
            AddCreatureAction::Name(name) => {
                emit(AddCreatureResult::Name(Step::Processing));
                emit(AddCreatureResult::Name(Step::Success(name)));
            }
            AddCreatureAction::Intelligence(index) => {
                emit(AddCreatureResult::Intelligence(Step::Processing));
                emit(AddCreatureResult::Intelligence(attribute_step(
                    Attribute::Intelligence,
                    index,
                )));
            }
            AddCreatureAction::Strength(index) => {
                emit(AddCreatureResult::Strength(Step::Processing));
                emit(AddCreatureResult::Strength(attribute_step(
                    Attribute::Strength,
                    index,
                )));
            }
            AddCreatureAction::Endurance(index) => {
                emit(AddCreatureResult::Endurance(Step::Processing));
                emit(AddCreatureResult::Endurance(attribute_step(
                    Attribute::Endurance,
                    index,
                )));
            }
            AddCreatureAction::Save {
                drawable,
                name,
                intelligence_index,
                strength_index,
                endurance_index,
            } => {
                emit(AddCreatureResult::Save(Step::Processing));
                let outcome = match self
                    .save(
                        drawable,
                        &name,
                        intelligence_index,
                        strength_index,
                        endurance_index,
                    )
                    .await
                {
                    Ok(()) => Step::Success(()),
                    Err(e) => {
                        warn!(error = %e, "saving creature failed");
                        Step::Failure(e)
                    }
                };
                emit(AddCreatureResult::Save(outcome));
            }
        }
    }
}
