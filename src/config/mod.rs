//! Configuration module for passive-crowd
//!
//! This module handles:
//! - Run configuration (crowd.toml or ~/.config/passive-crowd/config.toml)
//! - Dataset, annotator and training parameters
//! - Validation of user-supplied values

mod demo_config;

pub use demo_config::{
    load_demo_config,
    AnnotatorConfig,
    DatasetConfig,
    DemoConfig,
    OutputConfig,
    PROJECT_CONFIG_FILE,
    TrainingConfig,
    EXAMPLE_CONFIG,
};
