//! Migration definitions and chain resolution.
//!
//! Submodules:
//! - `node`: MigrationNode and the `.sql` definition format
//! - `source`: directory loader and migration authoring
//! - `resolver`: ordering and applied/pending classification

pub mod node;
pub mod resolver;
pub mod source;

pub use node::MigrationNode;
pub use resolver::{
    Anomaly, MigrationEntry, MigrationStatus, NO_REVISION_SENTINEL, Resolution, resolve,
};
pub use source::MigrationDir;
