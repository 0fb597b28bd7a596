// vcorp-memory — in-memory storage adapter.
//
// Backs tests and local development with a HashMap store implementing
// the core Adapter trait, including dotted-path filters and atomic
// increments so billing code behaves the same as against MongoDB.

mod adapter;

pub use adapter::MemoryAdapter;
