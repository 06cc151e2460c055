// All conversion logic is in orabricks-core
// This CLI is a thin wrapper: read a script, convert it, write the results

// CLI-specific modules
pub mod output;
pub mod panics;

// Re-export core types for convenience
pub use orabricks_core::*;
