pub mod fetch;
pub mod run;

// Re-export command functions for convenience
pub use fetch::fetch;
pub use run::run;
