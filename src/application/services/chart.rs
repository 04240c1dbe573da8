//! Chart engine service
//!
//! Owns every board of a chart together with its filter selection, the shared
//! viewport and the pointer interaction state. This is the surface editors,
//! exporters and persistence talk to.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::application::services::storage::ChartDocument;
use crate::application::ApplicationResult;
use crate::domain::{
    compute_visible, BoardArena, Bounds, DomainError, EventDisposition, Filters, Interaction,
    LayoutConfig, LayoutEngine, LayoutMode, NodeId, Person, Point, PointerEvent, PointerTarget,
    Rollback, Size, Viewport, ViewportConfig,
};

/// Viewport size assumed until the host reports one.
pub const DEFAULT_VIEWPORT_SIZE: Size = Size {
    width: 1280.0,
    height: 720.0,
};

/// Filtered, positioned snapshot of one board for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardExport {
    pub board: String,
    pub filters: Filters,
    pub people: Vec<Person>,
}

#[derive(Debug)]
struct BoardState {
    arena: BoardArena,
    filters: Filters,
}

impl BoardState {
    fn visible_ids(&self) -> Vec<NodeId> {
        compute_visible(&self.arena, &self.filters)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    fn visible_people(&self) -> Vec<Person> {
        compute_visible(&self.arena, &self.filters)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Service driving layout, filtering, viewport and interaction for all boards.
#[derive(Debug)]
pub struct ChartService {
    boards: BTreeMap<String, BoardState>,
    active: Option<String>,
    layout: LayoutEngine,
    viewport: Viewport,
    viewport_size: Size,
    interaction: Interaction,
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), ViewportConfig::default())
    }
}

impl ChartService {
    pub fn new(layout: LayoutConfig, viewport: ViewportConfig) -> Self {
        Self {
            boards: BTreeMap::new(),
            active: None,
            layout: LayoutEngine::new(layout),
            viewport: Viewport::new(viewport),
            viewport_size: DEFAULT_VIEWPORT_SIZE,
            interaction: Interaction::new(LayoutMode::default()),
        }
    }

    /// Load every board of a persisted chart; the first board becomes active.
    pub fn load_document(&mut self, document: ChartDocument) {
        for (board, people) in document.boards {
            self.load_hierarchy(&board, people);
        }
    }

    /// Persistable snapshot of all boards (positions included).
    pub fn to_document(&self) -> ChartDocument {
        ChartDocument {
            boards: self
                .boards
                .iter()
                .map(|(name, state)| (name.clone(), state.arena.to_people()))
                .collect(),
        }
    }

    // ------------------------------------------------------------
    // Boards and hierarchy
    // ------------------------------------------------------------

    /// Replace a board's people. Filters of an existing board are kept.
    /// Nothing is validated against other boards.
    #[instrument(level = "debug", skip(self, people), fields(count = people.len()))]
    pub fn load_hierarchy(&mut self, board: &str, people: Vec<Person>) {
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let arena = BoardArena::from_people(board, people);
        match self.boards.get_mut(board) {
            Some(state) => state.arena = arena,
            None => {
                self.boards.insert(
                    board.to_string(),
                    BoardState {
                        arena,
                        filters: Filters::default(),
                    },
                );
            }
        }
        if self.active.is_none() {
            self.active = Some(board.to_string());
        }
        self.refresh_hover(board);
        info!(board, "hierarchy loaded");
    }

    pub fn board_names(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }

    pub fn board(&self, board: &str) -> ApplicationResult<&BoardArena> {
        Ok(&self.state(board)?.arena)
    }

    pub fn active_board(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make `board` the one shown. Any gesture on the previous board is discarded.
    pub fn switch_board(&mut self, board: &str) -> ApplicationResult<()> {
        self.state(board)?;
        self.cancel_interaction();
        self.interaction.hover_leave();
        debug!(from = ?self.active, to = board, "switch board");
        self.active = Some(board.to_string());
        Ok(())
    }

    /// Insert or replace a person, then re-layout the board.
    pub fn upsert_node(&mut self, board: &str, person: Person) -> ApplicationResult<Vec<Person>> {
        if person.id.is_empty() {
            return Err(DomainError::InvalidEntity {
                message: format!("person '{}' has no id", person.name),
            }
            .into());
        }
        if person.reports_to.as_deref() == Some(person.id.as_str()) {
            return Err(self_report(&person.id).into());
        }
        if self.is_active(board) {
            self.cancel_interaction();
        }
        self.state_mut(board)?.arena.insert_node(person);
        self.refresh_hover(board);
        self.apply_auto_layout(board)
    }

    /// Remove a person (direct reports become roots), then re-layout the board.
    pub fn remove_node(&mut self, board: &str, id: &str) -> ApplicationResult<Vec<Person>> {
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let state = self.state_mut(board)?;
        if state.arena.remove_node(id).is_none() {
            return Err(unknown_node(board, id).into());
        }
        state.filters.collapsed_ids.remove(id);
        self.refresh_hover(board);
        self.apply_auto_layout(board)
    }

    /// Change a person's manager, then re-layout the board.
    pub fn set_reports_to(
        &mut self,
        board: &str,
        id: &str,
        manager: Option<&str>,
    ) -> ApplicationResult<Vec<Person>> {
        if manager == Some(id) {
            return Err(self_report(id).into());
        }
        if self.is_active(board) {
            self.cancel_interaction();
        }
        self.state_mut(board)?.arena.set_reports_to(id, manager)?;
        self.refresh_hover(board);
        self.apply_auto_layout(board)
    }

    // ------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------

    /// Lay out the currently visible people of `board` and fit the view.
    ///
    /// Returns the visible people with their new positions; empty (and a
    /// no-op) when nothing is visible.
    #[instrument(level = "debug", skip(self))]
    pub fn apply_auto_layout(&mut self, board: &str) -> ApplicationResult<Vec<Person>> {
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let state = self
            .boards
            .get_mut(board)
            .ok_or_else(|| DomainError::UnknownBoard(board.to_string()))?;
        let visible = state.visible_ids();
        let result = self.layout.apply(&mut state.arena, &visible)?;
        if result.is_empty() {
            return Ok(Vec::new());
        }
        let people = state.visible_people();
        if self.is_active(board) {
            self.fit_to_screen();
        }
        info!(board, placed = result.positions.len(), "auto layout applied");
        Ok(people)
    }

    /// Manual position override. Does not re-layout.
    pub fn update_node_position(&mut self, board: &str, id: &str, position: Point) -> ApplicationResult<()> {
        self.state_mut(board)?.arena.set_position(id, position)?;
        debug!(board, id, %position, "position updated");
        Ok(())
    }

    pub fn mode(&self) -> LayoutMode {
        self.interaction.mode()
    }

    /// Switch between automatic and manual placement.
    pub fn set_mode(&mut self, mode: LayoutMode) {
        let rollback = self.interaction.set_mode(mode);
        self.roll_back(rollback);
    }

    // ------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------

    /// Store the board's filters and return the resulting visible set.
    pub fn set_visibility_filter(&mut self, board: &str, filters: Filters) -> ApplicationResult<Vec<Person>> {
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let state = self.state_mut(board)?;
        state.filters = filters;
        Ok(state.visible_people())
    }

    pub fn filters(&self, board: &str) -> ApplicationResult<&Filters> {
        Ok(&self.state(board)?.filters)
    }

    /// Visible people of `board`, in board order.
    pub fn visible(&self, board: &str) -> ApplicationResult<Vec<&Person>> {
        let state = self.state(board)?;
        Ok(compute_visible(&state.arena, &state.filters))
    }

    /// Reset attribute filters; collapsed people stay collapsed.
    pub fn clear_filters(&mut self, board: &str) -> ApplicationResult<Vec<Person>> {
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let state = self.state_mut(board)?;
        state.filters.clear_attributes();
        Ok(state.visible_people())
    }

    /// Collapse or expand `id`; returns true if it is now collapsed.
    pub fn toggle_collapse(&mut self, board: &str, id: &str) -> ApplicationResult<bool> {
        if !self.state(board)?.arena.contains(id) {
            return Err(unknown_node(board, id).into());
        }
        if self.is_active(board) {
            self.cancel_interaction();
        }
        let state = self.state_mut(board)?;
        let collapsed = state.filters.toggle_collapsed(id);
        debug!(board, id, collapsed, "toggle collapse");
        Ok(collapsed)
    }

    /// Ancestors, the person and all transitive reports.
    pub fn get_reporting_chain(&self, board: &str, id: &str) -> ApplicationResult<HashSet<NodeId>> {
        Ok(self.state(board)?.arena.reporting_chain(id))
    }

    /// Visible people of `board` with positions, for export.
    pub fn export_board(&self, board: &str) -> ApplicationResult<BoardExport> {
        let state = self.state(board)?;
        Ok(BoardExport {
            board: board.to_string(),
            filters: state.filters.clone(),
            people: state.visible_people(),
        })
    }

    // ------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    pub fn to_viewport_coords(&self, model: Point) -> Point {
        self.viewport.to_screen(model)
    }

    pub fn to_model_coords(&self, screen: Point) -> Point {
        self.viewport.to_model(screen)
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn wheel_zoom(&mut self, delta: f64) -> EventDisposition {
        self.viewport.wheel_zoom(delta)
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset_view();
    }

    /// Fit the active board's visible, positioned people into the viewport.
    pub fn fit_to_screen(&mut self) -> bool {
        let node = self.node_size();
        let size = self.viewport_size;
        let Some(state) = self.active.as_deref().and_then(|b| self.boards.get(b)) else {
            return false;
        };
        let positions: Vec<Point> = compute_visible(&state.arena, &state.filters)
            .into_iter()
            .filter_map(|p| p.position)
            .collect();
        self.viewport.fit_to_screen(positions, node, size)
    }

    /// Center the view on a person of the active board.
    pub fn focus_on(&mut self, id: &str) -> ApplicationResult<()> {
        let board = self
            .active
            .clone()
            .ok_or_else(|| DomainError::UnknownBoard("<none loaded>".to_string()))?;
        let position = self
            .state(&board)?
            .arena
            .get(id)
            .ok_or_else(|| unknown_node(&board, id))?
            .position
            .unwrap_or(Point::ORIGIN);
        let node = self.node_size();
        self.viewport.focus_on(position, node, self.viewport_size);
        Ok(())
    }

    /// Topmost visible person of the active board under a screen point.
    pub fn node_at(&self, screen: Point) -> Option<NodeId> {
        let state = self.active.as_deref().and_then(|b| self.boards.get(b))?;
        let model = self.viewport.to_model(screen);
        let node = self.node_size();
        compute_visible(&state.arena, &state.filters)
            .into_iter()
            .rev()
            .find(|p| {
                p.position
                    .and_then(|pos| Bounds::around_nodes([pos], node))
                    .is_some_and(|b| b.contains(model))
            })
            .map(|p| p.id.clone())
    }

    // ------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Feed a pointer event for the active board.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> EventDisposition {
        let Some(state) = self.active.as_deref().and_then(|b| self.boards.get_mut(b)) else {
            return EventDisposition::Ignored;
        };
        self.interaction
            .handle(event, &mut state.arena, &mut self.viewport)
    }

    /// Pointer-down with the target resolved by hit testing.
    pub fn pointer_down_at(&mut self, at: Point) -> EventDisposition {
        let target = match self.node_at(at) {
            Some(id) => PointerTarget::Node(id),
            None => PointerTarget::Background,
        };
        self.handle_pointer(&PointerEvent::Down { at, target })
    }

    pub fn hover_enter(&mut self, id: &str) {
        if let Some(state) = self.active.as_deref().and_then(|b| self.boards.get(b)) {
            self.interaction.hover_enter(&state.arena, id);
        }
    }

    pub fn hover_leave(&mut self) {
        self.interaction.hover_leave();
    }

    pub fn highlighted(&self) -> &HashSet<NodeId> {
        self.interaction.highlighted()
    }

    /// Prevent dragging `id` on `board` while another editor works on it.
    pub fn lock_node(&mut self, board: &str, id: &str) {
        let rollback = self.interaction.lock_node(board, id);
        self.roll_back(rollback);
    }

    pub fn unlock_node(&mut self, board: &str, id: &str) -> bool {
        self.interaction.unlock_node(board, id)
    }

    /// Abort a pan or drag on the active board, restoring its start.
    pub fn cancel_interaction(&mut self) {
        let rollback = self.interaction.cancel();
        self.roll_back(rollback);
    }

    /// Recompute the highlighted chain after the active board changed shape.
    /// Drops the hover when the hovered person is gone.
    fn refresh_hover(&mut self, board: &str) {
        if !self.is_active(board) {
            return;
        }
        let Some(hovered) = self.interaction.hovered().map(str::to_string) else {
            return;
        };
        match self.boards.get(board) {
            Some(state) if state.arena.contains(&hovered) => {
                self.interaction.hover_enter(&state.arena, &hovered);
            }
            _ => {
                debug!(board, id = %hovered, "hovered person gone");
                self.interaction.hover_leave();
            }
        }
    }

    // Gestures only ever run on the active board
    fn roll_back(&mut self, rollback: Rollback) {
        if let Some(state) = self.active.as_deref().and_then(|b| self.boards.get_mut(b)) {
            rollback.apply(&mut state.arena, &mut self.viewport);
        }
    }

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------

    fn node_size(&self) -> Size {
        let config = self.layout.config();
        Size::new(config.node_width, config.node_height)
    }

    fn is_active(&self, board: &str) -> bool {
        self.active.as_deref() == Some(board)
    }

    fn state(&self, board: &str) -> Result<&BoardState, DomainError> {
        self.boards
            .get(board)
            .ok_or_else(|| DomainError::UnknownBoard(board.to_string()))
    }

    fn state_mut(&mut self, board: &str) -> Result<&mut BoardState, DomainError> {
        self.boards
            .get_mut(board)
            .ok_or_else(|| DomainError::UnknownBoard(board.to_string()))
    }
}

fn self_report(id: &str) -> DomainError {
    DomainError::InvalidEntity {
        message: format!("person '{id}' reports to itself"),
    }
}

fn unknown_node(board: &str, id: &str) -> DomainError {
    DomainError::UnknownNode {
        board: board.to_string(),
        id: id.to_string(),
    }
}
