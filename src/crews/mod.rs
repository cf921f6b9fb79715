//! Crew run output.

pub mod crew_output;

pub use crew_output::CrewOutput;
