//! Workload module
//!
//! Contains the busy-work unit and the fan-out dispatcher that splits one
//! invocation across concurrent sub-tasks.

pub mod parallel;
pub mod unit;

// Re-export commonly used types
pub use parallel::{Accumulation, ParallelDispatch};
pub use unit::{perform, CpuWork, SleepWork, WorkReport, Workload};
