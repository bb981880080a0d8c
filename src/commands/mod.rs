pub mod harvest;
pub mod maintenance;
pub mod run;
pub mod stats;

// Re-export command functions for convenience
pub use harvest::harvest;
pub use maintenance::reset;
pub use run::run;
pub use stats::{history, stats};
