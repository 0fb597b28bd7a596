// Database abstractions: the adapter trait and typed models.

pub mod adapter;
pub mod models;

pub use adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SortBy, SortDirection,
    WhereClause,
};
