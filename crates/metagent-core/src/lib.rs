//! # metagent-core
//!
//! Orchestration core for the metagent platform: a closed tool set, a
//! planner with a deterministic heuristic fallback, a per-call tool
//! executor, a response composer, and a multi-step flow for composite
//! agents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TaskRunner                            │
//! │  ┌──────────┐   ┌───────────────┐   ┌────────────────────┐   │
//! │  │ Planner  │──▶│   Executor    │──▶│     Composer       │   │
//! │  │ (+heur.) │   │   (ToolBox)   │   │  (final answer)    │   │
//! │  └──────────┘   └───────────────┘   └────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//!          │                 │                    │
//!   CompletionClient   SearchBackend /     CompletionClient
//!     (optional)       WeatherBackend        (optional)
//! ```
//!
//! Every external collaborator is a trait object injected by the
//! caller. Injecting no completion client is a supported mode: the
//! planner switches to its heuristic and the composer returns the tool
//! notes, so the pipeline stays fully deterministic offline.

pub mod backends;
pub mod completion;
mod composite;
pub mod error;
pub mod factory;
pub mod model;
pub mod planner;
pub mod runner;
pub mod tools;

pub use backends::{SearchBackend, ToolBackends, WeatherBackend};
pub use completion::{ChatTurn, CompletionClient, Role, ScriptedCompletion};
pub use error::{AgentError, Result};
pub use factory::AgentFactory;
pub use model::{AgentDefinition, AgentSummary, TaskResult, ToolCallTrace, ToolConfig};
pub use planner::PlannedCall;
pub use runner::TaskRunner;
pub use tools::{Tool, ToolBox, ToolName};
