use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::model::Creature;
use super::repository::CreatureRepository;
use crate::mvi::{Mvi, Processor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllCreaturesIntent {
    LoadAll,
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllCreaturesAction {
    LoadAll,
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAllCreaturesResult {
    Loading,
    Success(Vec<Creature>),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearAllCreaturesResult {
    Clearing,
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllCreaturesResult {
    Load(LoadAllCreaturesResult),
    Clear(ClearAllCreaturesResult),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllCreaturesState {
    pub is_loading: bool,
    pub creatures: Vec<Creature>,
    pub error: Option<String>,
}

/// Creature list screen.
pub struct AllCreatures;

impl Mvi for AllCreatures {
    type Intent = AllCreaturesIntent;
    type Action = AllCreaturesAction;
    type Outcome = AllCreaturesResult;
    type State = AllCreaturesState;

    fn initial_state() -> AllCreaturesState {
        AllCreaturesState::default()
    }

    fn is_initial(intent: &AllCreaturesIntent) -> bool {
        matches!(intent, AllCreaturesIntent::LoadAll)
    }

    fn action_from_intent(intent: AllCreaturesIntent) -> AllCreaturesAction {
        match intent {
            AllCreaturesIntent::LoadAll => AllCreaturesAction::LoadAll,
            AllCreaturesIntent::ClearAll => AllCreaturesAction::ClearAll,
        }
    }

    fn reduce(state: &AllCreaturesState, result: AllCreaturesResult) -> AllCreaturesState {
        match result {
            AllCreaturesResult::Load(LoadAllCreaturesResult::Loading)
            | AllCreaturesResult::Clear(ClearAllCreaturesResult::Clearing) => AllCreaturesState {
                is_loading: true,
                error: None,
                ..state.clone()
            },
            AllCreaturesResult::Load(LoadAllCreaturesResult::Success(creatures)) => {
                AllCreaturesState {
                    is_loading: false,
                    creatures,
                    error: None,
                }
            }
            AllCreaturesResult::Clear(ClearAllCreaturesResult::Success) => AllCreaturesState {
                is_loading: false,
                creatures: Vec::new(),
                error: None,
            },
            AllCreaturesResult::Load(LoadAllCreaturesResult::Failure(error))
            | AllCreaturesResult::Clear(ClearAllCreaturesResult::Failure(error)) => {
                AllCreaturesState {
                    is_loading: false,
                    error: Some(error),
                    ..state.clone()
                }
            }
        }
    }
}

pub struct AllCreaturesProcessor {
    repository: Arc<dyn CreatureRepository>,
}

impl AllCreaturesProcessor {
    pub fn new(repository: Arc<dyn CreatureRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Processor<AllCreatures> for AllCreaturesProcessor {
    async fn process(
        &self,
        action: AllCreaturesAction,
        emit: &mut (dyn FnMut(AllCreaturesResult) + Send),
    ) {
        match action {
            AllCreaturesAction::LoadAll => {
                emit(AllCreaturesResult::Load(LoadAllCreaturesResult::Loading));
                let result = match self.repository.all_creatures().await {
                    Ok(creatures) => LoadAllCreaturesResult::Success(creatures),
                    Err(e) => {
                        warn!(error = %e, "loading creatures failed");
                        LoadAllCreaturesResult::Failure(e.to_string())
                    }
                };
                emit(AllCreaturesResult::Load(result));
            }
            AllCreaturesAction::ClearAll => {
                emit(AllCreaturesResult::Clear(ClearAllCreaturesResult::Clearing));
                let result = match self.repository.clear_all_creatures().await {
                    Ok(()) => ClearAllCreaturesResult::Success,
                    Err(e) => {
                        warn!(error = %e, "clearing creatures failed");
                        ClearAllCreaturesResult::Failure(e.to_string())
                    }
                };
                emit(AllCreaturesResult::Clear(result));
            }
        }
    }
}
