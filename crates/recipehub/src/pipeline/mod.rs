//! Save pipeline: normalization, persistence and the ordered post-write
//! stages that keep directories, manifests, counts and clones consistent.

pub mod context;
pub mod hub;
pub mod stages;

pub use context::{EntityKind, SaveContext};
pub use hub::{CreatedCallback, Hub};
pub use stages::{Stage, STAGES};
