// src/lib.rs

// Import the top-level `ralph` module.
pub mod ralph;

// Re-export the component modules at the crate level so callers don't have
// to navigate the whole hierarchy (ralph::driver instead of ralph::ralph::driver).
pub use ralph::{
    budget, driver, error, event, git, prompt, providers, runner, signal, state, supervisor, task,
    thrash,
};

// Re-exporting key items for easier external access.
pub use ralph::driver::{Driver, DriverConfig, Outcome};
pub use ralph::error::RalphError;
pub use ralph::signal::Signal;
