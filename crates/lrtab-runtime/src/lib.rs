//! Runtime implementation for `lrtab` parse tables.

pub mod definition;
pub mod engine;

pub use crate::{
    definition::{ParseAction, ParseTable},
    engine::{parse, EngineConfig, ParseEngine, ParseOutcome, RejectReason, Status, StepAction},
};
