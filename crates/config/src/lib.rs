//! Task input parsing for test runs on Azure Pipelines agents.
//!
//! This crate reads a test task's inputs, pipeline variables and endpoint
//! credentials, validates them, and assembles the configuration records a
//! test runner consumes:
//!
//! - [`VsTestConfigurations`] for a run on a single agent
//! - [`DtaTestConfigurations`] for a run distributed across the agents of a
//!   phase
//!
//! Inputs come from a [`TaskEnvironment`]. [`ProcessEnvironment`] reads what
//! the agent exports into the process environment; [`MemoryEnvironment`]
//! holds the same data in memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use vstest_config::{Assembler, ProcessEnvironment, TaskEnvironment};
//!
//! let mut env = ProcessEnvironment::new();
//! let config = Assembler::new().distributed(&mut env)?;
//! println!("{}", serde_json::to_string(&config)?);
//! for update in env.take_updates() {
//!     println!("{update}");
//! }
//! ```

pub mod assembler;
pub mod dta;
pub mod error;
pub mod models;
pub mod parse;
pub mod runner;
pub mod selection;
pub mod tia;
pub mod variables;

pub use assembler::{Assembler, distributed_test_configurations, vs_test_configurations};
pub use dta::{DtaEnvironment, InstanceCounter, RunScope, job_token};
pub use error::{Error, Result};
pub use models::{DtaTestConfigurations, TestConfiguration, VsTestConfigurations, VsTestLocationMethod};
pub use runner::{NoopResolver, RunnerDetailsResolver};
pub use selection::{SelectorKind, TestSelection};
pub use tia::{TiaConfiguration, TiaContext};
pub use variables::{
    EndpointAuthorization, MemoryEnvironment, ProcessEnvironment, TaskEnvironment, VariableUpdate,
};
