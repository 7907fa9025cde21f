pub mod content_item;
pub mod intake;
pub mod lane;

pub use crate::types::identifiers::{ItemId, SourceId};
pub use content_item::{inspect_embedding, precedence, ContentItem, EmbeddingDefect, ItemError};
pub use intake::{admit, Intake, MalformedEmbedding, RejectedItem};
pub use lane::{Lane, LaneScores};
