//! Hard negative mining.
//!
//! A [`NegGenerator`] scans background images with a sliding window
//! and keeps the crops the current cascade still accepts as faces.
//! Every worker drives its own [`MiningState`];
//! the only shared mutable state is a pair of atomic cursors
//! and the [`MiningSink`] collecting the hits.

// Per-worker sweep cursor.
mod state;
// The generator and its shared accumulator.
mod generator;
// Colored console report of a mining round.
mod report;


pub use state::{MiningState, Window};
pub use generator::{
    NegGenerator,
    MiningSink,
    MiningOutcome,
    MiningStats,
};
