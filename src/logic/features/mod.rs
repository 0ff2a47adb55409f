//! Features Module - Feature derivation for the demand series
//!
//! - `layout` - scorer schema (order, version, hash)
//! - `vector` - `FeatureVector` and the versioned `ScorerInput`
//! - `deriver` - window snapshot → feature vector

pub mod deriver;
pub mod layout;
pub mod vector;


pub use deriver::derive;
pub use layout::LayoutInfo;
pub use vector::{FeatureVector, ScorerInput};
