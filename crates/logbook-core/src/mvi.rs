//! Intent → action → outcome → state.
//!
//! A screen implements [`Mvi`]: it maps intents to actions and folds
//! outcomes into its state with a pure `reduce`. A [`Processor`] performs the
//! action's side effects and emits outcomes, the in-flight one first.
//! [`Store`] drives one screen on the caller's task; [`ViewModel`] runs a
//! store behind an intent channel and publishes the current state.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

pub trait Mvi: Send + Sync + 'static {
    type Intent: Debug + Send + 'static;
    type Action: Debug + Send + 'static;
    type Outcome: Debug + Send + 'static;
    type State: Debug + Clone + PartialEq + Send + Sync + 'static;

    fn initial_state() -> Self::State;

    /// Initial intents (e.g. the first load) are admitted once per store.
    fn is_initial(_intent: &Self::Intent) -> bool {
        false
    }

    fn action_from_intent(intent: Self::Intent) -> Self::Action;

    fn reduce(state: &Self::State, outcome: Self::Outcome) -> Self::State;
}

#[async_trait]
pub trait Processor<M: Mvi>: Send + Sync {
    async fn process(&self, action: M::Action, emit: &mut (dyn FnMut(M::Outcome) + Send));
}

pub struct Store<M: Mvi> {
    processor: Arc<dyn Processor<M>>,
    state: M::State,
    initial_seen: bool,
    publisher: Option<watch::Sender<M::State>>,
}

impl<M: Mvi> Store<M> {
    pub fn new(processor: Arc<dyn Processor<M>>) -> Self {
        Self {
            processor,
            state: M::initial_state(),
            initial_seen: false,
            publisher: None,
        }
    }

    fn with_publisher(processor: Arc<dyn Processor<M>>, publisher: watch::Sender<M::State>) -> Self {
        Self {
            publisher: Some(publisher),
            ..Self::new(processor)
        }
    }

    pub fn state(&self) -> &M::State {
        &self.state
    }

    /// Run one intent to completion and return the states it produced.
    /// A state equal to its predecessor is not emitted.
    pub async fn dispatch(&mut self, intent: M::Intent) -> Vec<M::State> {
        if M::is_initial(&intent) {
            if self.initial_seen {
                debug!(?intent, "initial intent already handled");
                return Vec::new();
            }
            self.initial_seen = true;
        }
        let action = M::action_from_intent(intent);
        debug!(?action, "processing");

        let processor = Arc::clone(&self.processor);
        let state = &mut self.state;
        let publisher = self.publisher.as_ref();
        let mut emitted = Vec::new();
        let mut apply = |outcome: M::Outcome| {
            let next = M::reduce(state, outcome);
            if next != *state {
                *state = next.clone();
                if let Some(publisher) = publisher {
                    publisher.send_replace(next.clone());
                }
                emitted.push(next);
            }
        };
        processor.process(action, &mut apply).await;
        emitted
    }
}

/// Store running on its own task. Intents are handled strictly in the order
/// they are sent.
pub struct ViewModel<M: Mvi> {
    intents: mpsc::UnboundedSender<M::Intent>,
    states: watch::Receiver<M::State>,
    task: JoinHandle<()>,
}

impl<M: Mvi> ViewModel<M> {
    /// Start the event loop. Must be called inside a tokio runtime.
    pub fn spawn(processor: Arc<dyn Processor<M>>) -> Self {
        let (intent_tx, mut intent_rx) = mpsc::unbounded_channel::<M::Intent>();
        let (state_tx, state_rx) = watch::channel(M::initial_state());
        let mut store = Store::with_publisher(processor, state_tx);
        let task = tokio::spawn(async move {
            while let Some(intent) = intent_rx.recv().await {
                store.dispatch(intent).await;
            }
            debug!("intent channel closed");
        });
        Self {
            intents: intent_tx,
            states: state_rx,
            task,
        }
    }

    /// Queue an intent. Fails only if the event loop has stopped.
    pub fn process_intent(&self, intent: M::Intent) -> Result<(), mpsc::error::SendError<M::Intent>> {
        self.intents.send(intent)
    }

    pub fn state(&self) -> M::State {
        self.states.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<M::State> {
        self.states.clone()
    }

    /// Stop accepting intents, drain the queue, and return the final state.
    pub async fn shutdown(self) -> M::State {
        let Self {
            intents,
            states,
            task,
        } = self;
        drop(intents);
        if let Err(e) = task.await {
            tracing::error!(error = %e, "view model task failed");
        }
        let state = states.borrow().clone();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    #[derive(Debug)]
    enum CounterIntent {
        Start,
        Add(i64),
        Noop,
    }

    #[derive(Debug)]
    enum CounterAction {
        Reset,
        Add(i64),
        Noop,
    }

    #[derive(Debug)]
    enum CounterOutcome {
        Busy,
        Value(i64),
        Idle,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct CounterState {
        busy: bool,
        value: i64,
    }

    impl Mvi for Counter {
        type Intent = CounterIntent;
        type Action = CounterAction;
        type Outcome = CounterOutcome;
        type State = CounterState;

        fn initial_state() -> CounterState {
            CounterState::default()
        }

        fn is_initial(intent: &CounterIntent) -> bool {
            matches!(intent, CounterIntent::Start)
        }

        fn action_from_intent(intent: CounterIntent) -> CounterAction {
            match intent {
                CounterIntent::Start => CounterAction::Reset,
                CounterIntent::Add(n) => CounterAction::Add(n),
                CounterIntent::Noop => CounterAction::Noop,
            }
        }

        fn reduce(state: &CounterState, outcome: CounterOutcome) -> CounterState {
            match outcome {
                CounterOutcome::Busy => CounterState {
                    busy: true,
                    ..state.clone()
                },
                CounterOutcome::Value(value) => CounterState { busy: false, value },
                CounterOutcome::Idle => state.clone(),
            }
        }
    }

    #[derive(Default)]
    struct CounterProcessor {
        total: parking_lot::Mutex<i64>,
    }

    #[async_trait]
    impl Processor<Counter> for CounterProcessor {
        async fn process(
            &self,
            action: CounterAction,
            emit: &mut (dyn FnMut(CounterOutcome) + Send),
        ) {
            match action {
                CounterAction::Reset => {
                    emit(CounterOutcome::Busy);
                    *self.total.lock() = 100;
                    emit(CounterOutcome::Value(100));
                }
                CounterAction::Add(n) => {
                    emit(CounterOutcome::Busy);
                    let value = {
                        let mut total = self.total.lock();
                        *total += n;
                        *total
                    };
                    emit(CounterOutcome::Value(value));
                }
                CounterAction::Noop => emit(CounterOutcome::Idle),
            }
        }
    }

    #[tokio::test]
    async fn dispatch_emits_in_flight_then_result() {
        let mut store = Store::<Counter>::new(Arc::new(CounterProcessor::default()));
        let states = store.dispatch(CounterIntent::Start).await;
        assert_eq!(
            states,
            vec![
                CounterState {
                    busy: true,
                    value: 0
                },
                CounterState {
                    busy: false,
                    value: 100
                },
            ]
        );
        assert_eq!(store.state().value, 100);
    }

    #[tokio::test]
    async fn unchanged_state_is_not_emitted() {
        let mut store = Store::<Counter>::new(Arc::new(CounterProcessor::default()));
        assert!(store.dispatch(CounterIntent::Noop).await.is_empty());
    }

    #[tokio::test]
    async fn initial_intent_is_admitted_once() {
        let mut store = Store::<Counter>::new(Arc::new(CounterProcessor::default()));
        store.dispatch(CounterIntent::Start).await;
        store.dispatch(CounterIntent::Add(5)).await;
        assert!(store.dispatch(CounterIntent::Start).await.is_empty());
        assert_eq!(store.state().value, 105);
    }

    #[tokio::test]
    async fn view_model_processes_intents_in_order() {
        let vm = ViewModel::<Counter>::spawn(Arc::new(CounterProcessor::default()));
        assert_eq!(vm.state(), CounterState::default());
        vm.process_intent(CounterIntent::Start).unwrap();
        vm.process_intent(CounterIntent::Add(-1)).unwrap();
        vm.process_intent(CounterIntent::Add(2)).unwrap();
        let last = vm.shutdown().await;
        assert_eq!(
            last,
            CounterState {
                busy: false,
                value: 101
            }
        );
    }

    #[tokio::test]
    async fn subscribers_observe_published_state() {
        let vm = ViewModel::<Counter>::spawn(Arc::new(CounterProcessor::default()));
        let mut rx = vm.subscribe();
        vm.process_intent(CounterIntent::Start).unwrap();
        let state = rx.wait_for(|s| s.value == 100 && !s.busy).await.unwrap().clone();
        assert_eq!(state.value, 100);
        assert_eq!(vm.state().value, 100);
    }
}
