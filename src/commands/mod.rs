pub mod notify;
pub mod resolve;
pub mod run;

// Re-export command functions for convenience
pub use notify::notify;
pub use resolve::resolve;
pub use run::{run, RunParams};
