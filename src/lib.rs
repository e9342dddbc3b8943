//! passive-crowd - learning from unreliable annotators
//!
//! Synthesizes a binary classification problem, simulates a panel of
//! annotators with distinct corruption patterns, and fits the passive crowd
//! model: a logistic classifier for the hidden true label plus one logistic
//! expertise function per annotator, trained jointly by EM.
//!
//! ```no_run
//! use passive_crowd::config::DemoConfig;
//! use passive_crowd::pipeline::run_demo;
//!
//! let run = run_demo(&DemoConfig::default())?;
//! println!("consensus accuracy {:.2}", run.metrics.consensus_accuracy);
//! # Ok::<(), passive_crowd::error::CrowdError>(())
//! ```

pub mod annotators;
pub mod config;
pub mod crowd;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod reporters;

pub use error::{CrowdError, CrowdResult};
