//! Decision Pipeline
//!
//! ```text
//! PayloadSource ─► Arbiter::evaluate ─► DecisionResponse | ArbiterError
//!                    │
//!                    ├─ validate   (ConflictRequest)
//!                    ├─ enrich     (ScheduleTable, optional)
//!                    ├─ decide     (DecisionEngine: equal-priority | classifier)
//!                    └─ format     (formatter)
//! ```
//!
//! One payload in, one result out; no state survives between decisions.

mod coordinator;
pub mod source;

pub use coordinator::Arbiter;
pub use source::{FileSource, InlineSource, PayloadSource, StdinSource};
