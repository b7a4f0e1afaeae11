//! FinishLine Library
//!
//! Deterministic horse-race probability extension and calibrated wager gating

pub mod calibration;
pub mod config;
pub mod decision;
pub mod engine;
pub mod features;
pub mod harville;
pub mod odds;
pub mod signals;
pub mod strategy;
pub mod types;
pub mod value;

pub use calibration::CalibrationProfile;
pub use decision::decide;
pub use features::score_runners;
pub use harville::extend_win_probabilities;
pub use strategy::classify;
