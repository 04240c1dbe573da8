//! Domain layer: hierarchy model, filters, layout and view state
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod filter;
pub mod interaction;
pub mod layout;
pub mod tree_view;
pub mod viewport;

pub use arena::{BoardArena, PreOrderIterator};
pub use entities::*;
pub use error::DomainError;
pub use filter::{compute_visible, Filters, ALL};
pub use interaction::{Interaction, InteractionState, PointerEvent, PointerTarget, Rollback};
pub use layout::{LayoutConfig, LayoutEngine, LayoutMode, LayoutResult};
pub use tree_view::render_board;
pub use viewport::{Bounds, EventDisposition, Viewport, ViewportConfig};
