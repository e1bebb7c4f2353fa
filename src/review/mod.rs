//! Review queue for AI-suggested postings and the pattern learner
//! that turns human corrections into reusable rules

pub mod patterns;
pub mod queue;

pub use patterns::*;
pub use queue::*;
