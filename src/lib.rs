//! Exercise Analyzer Worker: a stdio co-process that classifies exercise
//! phase/stage, counts reps, and scores form from per-frame 33-point pose
//! landmarks (`spec.md` §1). Reworked from `ai-coach-api`'s service-layer
//! conventions (keypoint geometry, classifier loading, feature scaling)
//! onto a single-threaded stdin/stdout loop in place of an HTTP surface.

pub mod analyzers;
pub mod clock;
pub mod config;
pub mod errors;
pub mod features;
pub mod geometry;
pub mod landmark;
pub mod model;
pub mod rep_counter;
pub mod scoring;
pub mod wire;
pub mod worker;
