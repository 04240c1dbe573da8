//! Two-pass tree layout.
//!
//! The width pass measures every visible subtree bottom-up; only then does the
//! position pass walk top-down, centering each manager inside the span its
//! subtree claimed and laying reports out left to right in board order.
//! Independent trees are placed left to right, separated by `team_spacing`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::arena::BoardArena;
use crate::domain::entities::{NodeId, Person, Point};
use crate::domain::error::DomainError;

/// Pixel sizes the layout works with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Minimum horizontal gap between sibling subtrees
    pub min_spacing: f64,
    /// Vertical distance between consecutive ranks
    pub level_height: f64,
    /// Horizontal gap between independent trees
    pub team_spacing: f64,
    pub base_x: f64,
    pub base_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 240.0,
            node_height: 120.0,
            min_spacing: 40.0,
            level_height: 200.0,
            team_spacing: 100.0,
            base_x: 50.0,
            base_y: 50.0,
        }
    }
}

/// Whether positions come from the layout algorithm or from dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Auto,
    Manual,
}

/// Output of one layout run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    /// Assigned positions in pre-order, trees left to right
    pub positions: Vec<(NodeId, Point)>,
    /// Horizontal span claimed by each laid-out subtree
    pub subtree_widths: HashMap<NodeId, f64>,
}

impl LayoutResult {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.positions
            .iter()
            .find(|(node, _)| node == id)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out the forest formed by `visible` without touching the board.
    ///
    /// A visible person whose manager is unset or not visible starts its own
    /// tree. People only reachable through a reporting cycle are laid out as
    /// extra trees, entered at the first such person in board order.
    #[instrument(level = "debug", skip(self, board, visible), fields(board = board.name(), visible = visible.len()))]
    pub fn compute(&self, board: &BoardArena, visible: &[&Person]) -> LayoutResult {
        if visible.is_empty() {
            debug!("nothing visible, layout skipped");
            return LayoutResult::default();
        }

        let mut pass = WidthPass {
            board,
            config: &self.config,
            visible: visible.iter().map(|p| p.id.as_str()).collect(),
            claimed: HashSet::new(),
            kids: HashMap::new(),
            widths: HashMap::new(),
        };

        let mut roots: Vec<&str> = visible
            .iter()
            .filter(|p| {
                p.reports_to
                    .as_deref()
                    .map_or(true, |m| !pass.visible.contains(m))
            })
            .map(|p| p.id.as_str())
            .collect();
        for &root in &roots {
            pass.measure(root);
        }
        // Whatever is still unclaimed hangs off a cycle
        for person in visible {
            let id = person.id.as_str();
            if !pass.claimed.contains(id) {
                warn!(board = board.name(), id, "reporting cycle, laying out as separate tree");
                pass.measure(id);
                roots.push(id);
            }
        }

        let mut positions = Vec::with_capacity(visible.len());
        let mut cursor = self.config.base_x;
        for root in roots {
            pass.place(root, cursor, 0, &mut positions);
            cursor += pass.width(root) + self.config.team_spacing;
        }

        debug!(placed = positions.len(), "layout complete");
        LayoutResult {
            positions,
            subtree_widths: pass
                .widths
                .into_iter()
                .map(|(id, w)| (id.to_string(), w))
                .collect(),
        }
    }

    /// Lay out `visible` and write the positions back into `board`.
    pub fn apply(&self, board: &mut BoardArena, visible_ids: &[NodeId]) -> Result<LayoutResult, DomainError> {
        let result = {
            let visible: Vec<&Person> = visible_ids.iter().filter_map(|id| board.get(id)).collect();
            self.compute(board, &visible)
        };
        for (id, position) in &result.positions {
            board.set_position(id, *position)?;
        }
        Ok(result)
    }
}

struct WidthPass<'a> {
    board: &'a BoardArena,
    config: &'a LayoutConfig,
    visible: HashSet<&'a str>,
    claimed: HashSet<&'a str>,
    kids: HashMap<&'a str, Vec<&'a str>>,
    widths: HashMap<&'a str, f64>,
}

impl<'a> WidthPass<'a> {
    /// Bottom-up: span of `id`'s subtree. Each person is claimed by exactly one tree.
    fn measure(&mut self, id: &'a str) -> f64 {
        self.claimed.insert(id);
        let candidates: Vec<&'a str> = self
            .board
            .children(id)
            .into_iter()
            .map(|p| p.id.as_str())
            .filter(|c| self.visible.contains(c))
            .collect();

        let mut kids = Vec::with_capacity(candidates.len());
        let mut total = 0.0;
        for child in candidates {
            if self.claimed.contains(child) {
                continue;
            }
            total += self.measure(child);
            kids.push(child);
        }

        let width = if kids.is_empty() {
            self.config.node_width
        } else {
            let gaps = (kids.len() - 1) as f64 * self.config.min_spacing;
            (total + gaps).max(self.config.node_width)
        };
        self.kids.insert(id, kids);
        self.widths.insert(id, width);
        width
    }

    fn width(&self, id: &str) -> f64 {
        self.widths.get(id).copied().unwrap_or(self.config.node_width)
    }

    /// Top-down: center `id` in `[start_x, start_x + width)` and place its reports.
    fn place(&self, id: &str, start_x: f64, depth: usize, out: &mut Vec<(NodeId, Point)>) {
        let width = self.width(id);
        let x = start_x + (width - self.config.node_width) / 2.0;
        let y = self.config.base_y + depth as f64 * self.config.level_height;
        out.push((id.to_string(), Point::new(x, y)));

        let mut cursor = start_x;
        for child in self.kids.get(id).map(Vec::as_slice).unwrap_or_default() {
            self.place(child, cursor, depth + 1, out);
            cursor += self.width(child) + self.config.min_spacing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Level;

    fn person(id: &str, manager: Option<&str>) -> Person {
        let p = Person::new(id, id, Level::Manager);
        match manager {
            Some(m) => p.reporting_to(m),
            None => p,
        }
    }

    fn layout(people: Vec<Person>) -> LayoutResult {
        let board = BoardArena::from_people("b", people);
        let visible: Vec<&Person> = board.iter().collect();
        LayoutEngine::default().compute(&board, &visible)
    }

    #[test]
    fn given_single_node_when_laying_out_then_placed_at_base() {
        let result = layout(vec![person("a", None)]);
        assert_eq!(result.position_of("a"), Some(Point::new(50.0, 50.0)));
        assert_eq!(result.subtree_widths["a"], 240.0);
    }

    #[test]
    fn given_manager_with_two_reports_when_laying_out_then_manager_centered() {
        let result = layout(vec![
            person("a", None),
            person("b", Some("a")),
            person("c", Some("a")),
        ]);

        let a = result.position_of("a").unwrap();
        let b = result.position_of("b").unwrap();
        let c = result.position_of("c").unwrap();
        assert!(a.y < b.y);
        assert_eq!(b.y, c.y);
        assert!(b.x + 240.0 + 40.0 <= c.x);
        assert_eq!(a.x, (b.x + c.x) / 2.0);
        assert_eq!(result.subtree_widths["a"], 520.0);
    }

    #[test]
    fn given_two_roots_when_laying_out_then_separated_by_team_spacing() {
        let result = layout(vec![person("a", None), person("z", None)]);
        let a = result.position_of("a").unwrap();
        let z = result.position_of("z").unwrap();
        assert_eq!(z.x - a.x, 240.0 + 100.0);
        assert_eq!(a.y, z.y);
    }

    #[test]
    fn given_dangling_manager_when_laying_out_then_node_becomes_root() {
        let result = layout(vec![person("a", None), person("x", Some("gone"))]);
        let x = result.position_of("x").unwrap();
        assert_eq!(x.y, 50.0);
        assert_eq!(result.positions.len(), 2);
    }

    #[test]
    fn given_cycle_when_laying_out_then_every_node_placed_once() {
        let result = layout(vec![
            person("root", None),
            person("a", Some("c")),
            person("b", Some("a")),
            person("c", Some("b")),
        ]);
        assert_eq!(result.positions.len(), 4);
        let b = result.position_of("b").unwrap();
        let a = result.position_of("a").unwrap();
        assert_eq!(b.y - a.y, 200.0);
    }

    #[test]
    fn given_nothing_visible_when_laying_out_then_result_empty() {
        let board = BoardArena::from_people("b", vec![person("a", None)]);
        let result = LayoutEngine::default().compute(&board, &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn given_board_when_applying_then_positions_written_back() {
        let mut board = BoardArena::from_people("b", vec![person("a", None), person("b", Some("a"))]);
        let ids: Vec<NodeId> = vec!["a".into(), "b".into()];

        LayoutEngine::default().apply(&mut board, &ids).expect("apply layout");

        assert_eq!(board.get("b").and_then(|p| p.position), Some(Point::new(50.0, 250.0)));
    }
}
