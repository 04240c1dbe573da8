//! Pointer interaction state machine.
//!
//! ```text
//! Idle --down(background)--------------> Panning      --up--> Idle
//! Idle --down(node, manual, unlocked)--> DraggingNode --up--> Idle
//! Panning | DraggingNode --leave/blur/cancel--> Idle (in-progress delta discarded)
//! ```
//!
//! Hover highlighting and node locks are tracked alongside but are
//! independent of the pointer state.

use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::domain::arena::BoardArena;
use crate::domain::entities::{NodeId, Point};
use crate::domain::layout::LayoutMode;
use crate::domain::viewport::{EventDisposition, Viewport};

/// What the pointer went down on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Background,
    Node(NodeId),
}

/// Input-system independent pointer events, in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down { at: Point, target: PointerTarget },
    Move { at: Point },
    Up { at: Point },
    /// Pointer left the canvas
    Leave,
    /// Window lost focus
    Blur,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning {
        origin: Point,
        start_pan: Point,
    },
    DraggingNode {
        board: String,
        id: NodeId,
        /// Model-space offset from the pointer to the node anchor
        grab_offset: Point,
        /// `None` when the node had never been placed
        start_position: Option<Point>,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Panning { .. } => "panning",
            InteractionState::DraggingNode { .. } => "dragging",
        }
    }
}

/// Undo record of an aborted gesture.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback {
    Nothing,
    Pan(Point),
    Position {
        id: NodeId,
        position: Option<Point>,
    },
}

impl Rollback {
    pub fn apply(self, board: &mut BoardArena, viewport: &mut Viewport) {
        match self {
            Rollback::Nothing => {}
            Rollback::Pan(pan) => viewport.set_pan(pan),
            Rollback::Position { id, position } => {
                // The node may have been removed meanwhile; nothing to restore then
                let _ = board.restore_position(&id, position);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interaction {
    state: InteractionState,
    mode: LayoutMode,
    hovered: Option<NodeId>,
    highlighted: HashSet<NodeId>,
    /// `(board, id)` pairs; ids are only unique within a board
    locked: HashSet<(String, NodeId)>,
}

impl Interaction {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Feed one pointer event through the machine.
    #[instrument(level = "trace", skip(self, board, viewport), fields(state = self.state.name()))]
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        board: &mut BoardArena,
        viewport: &mut Viewport,
    ) -> EventDisposition {
        match event {
            PointerEvent::Down { at, target } => self.pointer_down(*at, target, board, viewport),
            PointerEvent::Move { at } => self.pointer_move(*at, board, viewport),
            PointerEvent::Up { .. } => self.pointer_up(),
            PointerEvent::Leave | PointerEvent::Blur => {
                if self.state.is_idle() {
                    EventDisposition::Ignored
                } else {
                    self.cancel().apply(board, viewport);
                    EventDisposition::Consumed
                }
            }
        }
    }

    fn pointer_down(
        &mut self,
        at: Point,
        target: &PointerTarget,
        board: &BoardArena,
        viewport: &Viewport,
    ) -> EventDisposition {
        if !self.state.is_idle() {
            return EventDisposition::Ignored;
        }
        match target {
            PointerTarget::Background => {
                self.transition(InteractionState::Panning {
                    origin: at,
                    start_pan: viewport.pan(),
                });
                EventDisposition::Consumed
            }
            PointerTarget::Node(id) => {
                if self.mode != LayoutMode::Manual || self.is_locked(board.name(), id) {
                    trace!(%id, mode = ?self.mode, "drag not permitted");
                    return EventDisposition::Ignored;
                }
                let Some(person) = board.get(id) else {
                    return EventDisposition::Ignored;
                };
                let pointer = viewport.to_model(at);
                let anchor = person.position.unwrap_or(pointer);
                self.transition(InteractionState::DraggingNode {
                    board: board.name().to_string(),
                    id: id.clone(),
                    grab_offset: pointer - anchor,
                    start_position: person.position,
                });
                EventDisposition::Consumed
            }
        }
    }

    fn pointer_move(&mut self, at: Point, board: &mut BoardArena, viewport: &mut Viewport) -> EventDisposition {
        match &self.state {
            InteractionState::Idle => EventDisposition::Ignored,
            InteractionState::Panning { origin, start_pan } => {
                viewport.set_pan(*start_pan + (at - *origin));
                EventDisposition::Consumed
            }
            InteractionState::DraggingNode { id, grab_offset, .. } => {
                let position = viewport.to_model(at) - *grab_offset;
                if board.set_position(id, position).is_err() {
                    // Node vanished under the pointer
                    self.transition(InteractionState::Idle);
                }
                EventDisposition::Consumed
            }
        }
    }

    /// Finish the gesture, keeping whatever the moves applied. No re-layout.
    fn pointer_up(&mut self) -> EventDisposition {
        if self.state.is_idle() {
            return EventDisposition::Ignored;
        }
        self.transition(InteractionState::Idle);
        EventDisposition::Consumed
    }

    /// Abort an in-progress pan or drag.
    ///
    /// The returned rollback restores what the gesture started from and must
    /// be applied by the owner of the board and viewport.
    pub fn cancel(&mut self) -> Rollback {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => Rollback::Nothing,
            InteractionState::Panning { start_pan, .. } => {
                debug!("pan cancelled");
                Rollback::Pan(start_pan)
            }
            InteractionState::DraggingNode { id, start_position, .. } => {
                debug!(%id, "drag cancelled");
                Rollback::Position {
                    id,
                    position: start_position,
                }
            }
        }
    }

    /// Switch layout mode. Leaving manual mode aborts an active gesture.
    pub fn set_mode(&mut self, mode: LayoutMode) -> Rollback {
        let rollback = if self.mode == LayoutMode::Manual && mode != LayoutMode::Manual {
            self.cancel()
        } else {
            Rollback::Nothing
        };
        debug!(from = ?self.mode, to = ?mode, "layout mode");
        self.mode = mode;
        rollback
    }

    /// Highlight the hovered person's reporting chain.
    pub fn hover_enter(&mut self, board: &BoardArena, id: &str) {
        self.highlighted = board.reporting_chain(id);
        self.hovered = Some(id.to_string());
        trace!(id, highlighted = self.highlighted.len(), "hover");
    }

    pub fn hover_leave(&mut self) {
        self.hovered = None;
        self.highlighted.clear();
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn highlighted(&self) -> &HashSet<NodeId> {
        &self.highlighted
    }

    /// Block dragging `id` on `board`, e.g. while an editor has it open.
    /// An active drag of that node is aborted.
    pub fn lock_node(&mut self, board: &str, id: &str) -> Rollback {
        self.locked.insert((board.to_string(), id.to_string()));
        match &self.state {
            InteractionState::DraggingNode {
                board: dragged_board,
                id: dragged,
                ..
            } if dragged_board == board && dragged == id => self.cancel(),
            _ => Rollback::Nothing,
        }
    }

    pub fn unlock_node(&mut self, board: &str, id: &str) -> bool {
        self.locked.remove(&(board.to_string(), id.to_string()))
    }

    pub fn is_locked(&self, board: &str, id: &str) -> bool {
        self.locked.contains(&(board.to_string(), id.to_string()))
    }

    fn transition(&mut self, next: InteractionState) {
        debug!(from = self.state.name(), to = next.name(), "interaction");
        self.state = next;
    }
}
