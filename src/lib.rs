//! block-arbiter: block conflict arbitration for railway traffic control
//!
//! Given two trains contending for one block, decides which keeps precedence
//! and whether the other is slowed or held.
//!
//! ## Architecture
//!
//! - **Schedule**: train reference table (CSV) and identifier lookup
//! - **Features**: the 7-feature trip vector fed to the classifier
//! - **Engine**: equal-priority scoring or classifier-driven decision
//! - **Formatter**: external result record and reason text
//! - **Conflicts**: same-block, loop-line and junction detection over a schedule
//! - **Pipeline / API**: one-shot CLI evaluation and the HTTP decision service

pub mod api;
pub mod classifier;
pub mod config;
pub mod conflicts;
pub mod engine;
pub mod error;
pub mod features;
pub mod formatter;
pub mod pipeline;
pub mod schedule;
pub mod types;

pub use config::ArbiterConfig;
pub use engine::DecisionEngine;
pub use error::{ArbiterError, ErrorKind, ModelError, ScheduleError};
pub use formatter::{DecisionResponse, FailureResponse};
pub use pipeline::Arbiter;
pub use schedule::ScheduleTable;
pub use types::{
    Action, ConflictRequest, Decision, FeatureVector, TrainRecord, TrainRef, TripObservation,
};
