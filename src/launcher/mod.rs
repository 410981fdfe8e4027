//! Bounded-concurrency job launcher
//!
//! Starts each job as an independent OS process, never knowingly exceeding
//! the concurrency cap at the moment an admission decision is made.

mod core;
mod spawn;

pub use core::{LaunchSummary, Launcher};
pub use spawn::{JobHandle, ProcessSpawner, ShellSpawner};
