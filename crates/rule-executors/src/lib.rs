#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Turns a fired rule into bank client calls (§4.6 "Rule Executors").
//!
//! One module per rule family (`sweep`, `autosorter`, `auto_topup`), each a
//! free function taking the bits of context it needs rather than the whole
//! rule graph. [`dispatch::DefaultRuleExecutor`] is the thin layer that
//! picks the right one, records the outcome back onto the rule, and raises
//! a failure alert when the outcome isn't a benign, expected one.
//!
//! Deliberately has no dependency on `trigger-eval`: by the time a job
//! reaches an executor, `automation-integration` has already decided the
//! rule should fire. Executors only talk to `bank-client` and `local-store`.

mod alert;
mod auto_topup;
mod autosorter;
mod context;
mod dispatch;
mod sweep;

pub use alert::{FailureAlertSink, NoopAlertSink};
pub use auto_topup::{execute_auto_topup, AutoTopupResult};
pub use autosorter::{execute_autosorter, AllocationResult, AutosorterResult};
pub use context::ExecutionContext;
pub use dispatch::{DefaultRuleExecutor, RuleExecutor};
pub use sweep::{execute_sweep, SweepResult, SweepSourceResult};
