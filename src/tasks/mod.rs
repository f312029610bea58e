//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweep: Removes expired cache entries at configured intervals
//! - Re-probe: Brings a recovered remote tier back into use

mod cleanup;

pub use cleanup::{spawn_reprobe_task, spawn_sweep_task};
