//! Derived metrics over a filtered dataset.
//!
//! Every function here reads its input dataset and returns a new value; none
//! of them depends on another, so they may run in any order over the same
//! snapshot.

pub mod group;
pub mod performance;
pub mod summary;
pub mod trend;
