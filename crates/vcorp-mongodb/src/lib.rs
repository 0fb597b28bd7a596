// vcorp-mongodb — MongoDB storage adapter.
//
// Implements the core Adapter trait on top of a MongoDB database:
// collections per model, `_id` mapped to `id`, WHERE clauses compiled
// to find filters, and findOneAndUpdate for the atomic update and
// increment operations billing depends on.

mod adapter;
mod query;

pub use adapter::MongoAdapter;
