//! Shared data structures for block conflict arbitration
//!
//! This module defines the core types that flow through one decision:
//! - TrainRecord / ScheduledTrain (reference table rows)
//! - TripObservation / FeatureVector (per-train trip attributes and model input)
//! - ConflictRequest (validated input payload)
//! - Decision (engine output, before formatting)

mod train;
mod trip;
mod request;
mod decision;

pub use train::*;
pub use trip::*;
pub use request::*;
pub use decision::*;
