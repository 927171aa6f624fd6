pub mod bot;
pub mod dispatch;
pub mod engine;
pub mod hand;
pub mod policy;

pub use bot::{
    AiActionOutcome, BluffFeatures, BluffParams, DecisionContext, DecisionScheduler,
    SchedulerState, TargetSelector, TerminationReason, TickInputs, WeightModel, WeightTable,
};
pub use dispatch::{ActionDispatcher, ActionListener};
pub use engine::{BluffEngine, BluffEngineBuilder};
pub use hand::{HandCollaborator, SignalSource, StaticSignals};
pub use policy::{BluffPolicy, HeuristicBluffPolicy};
