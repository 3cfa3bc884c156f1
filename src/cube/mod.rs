//! Data cube construction
//!
//! ```text
//! CubeDefinition ─┬─> schema::Schema ───────────────────────┐
//!                 │                                         v
//! Table + Lookups ┴─> observations::generate ─> ResourceRegistry ─> assembler::assemble ─> Turtle
//! ```

pub mod assembler;
pub mod codes;
pub mod definition;
pub mod observations;
pub mod resources;
pub mod schema;

pub use assembler::{CubeGraph, assemble, to_turtle, write_turtle};
pub use codes::{CodeMap, LabelIndex, Lookups};
pub use definition::{ConceptKind, CubeDefinition, CubeKind};
pub use observations::{GenerationContext, GenerationStats, generate};
pub use resources::{ResourceKey, ResourceRegistry, normalize};
pub use schema::Schema;
