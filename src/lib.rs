//! Small programs that put pressure on operating system resources
//!
//! This crate provides three standalone tools meant to be run as child
//! processes by test harnesses that monitor or limit resource usage:
//!
//! - `alloc-churn` allocates page-touched memory blocks, then frees them
//! - `sleep-reporter` sleeps for a while and announces termination signals
//! - `cpu-burn` keeps a CPU core busy for a while
//!
//! Each tool reports its progress on stdout, one line per step, using a
//! line-oriented format that harnesses can parse. The logic of each tool lives
//! in a module of this library so that it can be tested without real delays.

#![deny(missing_docs)]

pub mod alloc;
pub mod burn;
pub mod cli;
pub mod sleep;
