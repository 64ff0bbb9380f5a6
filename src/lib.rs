//! trackprep: Track Dataset Preparation Library
//!
//! Turns a raw table of audio-feature track records into a rebalanced,
//! relabeled dataset with a stratified train/test split, cross-validation
//! folds and a fitted preprocessing plan, ready for classifier training.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod utils;
