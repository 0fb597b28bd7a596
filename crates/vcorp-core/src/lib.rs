// vcorp-core — shared foundation for the VCorp membership platform.
//
// Error taxonomy, structured logger, configuration options, program
// identifiers, the database adapter abstraction, and typed persistence
// models used by every other crate in the workspace.

pub mod db;
pub mod error;
pub mod logger;
pub mod options;
pub mod program;
