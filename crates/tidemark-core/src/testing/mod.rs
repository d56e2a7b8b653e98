//! Testing utilities for migration runs.
//!
//! The sequencer only talks to the database through [`StepExecutor`] and
//! [`LedgerReader`], so its behavior can be exercised end to end with the
//! in-memory [`MockStepExecutor`].
//!
//! [`StepExecutor`]: crate::executor::StepExecutor
//! [`LedgerReader`]: crate::executor::LedgerReader

pub mod mock_executor;

pub use mock_executor::MockStepExecutor;
