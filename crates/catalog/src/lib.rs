//! Catalog domain module: tools for sale and customer reviews.
//!
//! Pure domain types plus the persistence ports for them (no IO, no HTTP).

pub mod review;
pub mod tool;

pub use review::{Review, ReviewStore, SubmitReview};
pub use tool::{CreateTool, TOP_TOOLS_LIMIT, Tool, ToolQuery, ToolSort, ToolStore};
