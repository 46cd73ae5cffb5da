//! SeaORM entities for the node allocation tables.

pub mod dedicated_nodes;
pub mod node_events;
pub mod workspace_allocations;
