//! Text rendering of a board's reporting forest.

use std::collections::HashSet;

use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::BoardArena;
use crate::domain::entities::Person;
use crate::domain::filter::Filters;

/// Render a board as a tree headed by the board name, one branch per root.
///
/// Collapsed people are shown with their direct-report count and no branch
/// below them. Reports only reachable through a cycle are omitted.
#[instrument(level = "debug", skip(board, filters), fields(board = board.name()))]
pub fn render_board(board: &BoardArena, filters: &Filters) -> Tree<String> {
    let mut visited = HashSet::new();
    let leaves: Vec<_> = board
        .traversal_roots()
        .into_iter()
        .map(|root| build_tree(board, filters, root, &mut visited))
        .collect();

    Tree::new(format!("{} ({} people)", board.name(), board.len())).with_leaves(leaves)
}

fn build_tree<'a>(
    board: &'a BoardArena,
    filters: &Filters,
    person: &'a Person,
    visited: &mut HashSet<&'a str>,
) -> Tree<String> {
    visited.insert(person.id.as_str());
    if filters.is_collapsed(&person.id) {
        let count = board.direct_report_count(&person.id);
        return Tree::new(format!("{person} [+{count}]"));
    }

    let mut tree = Tree::new(person.to_string());
    for child in board.children(&person.id) {
        if visited.contains(child.id.as_str()) {
            continue;
        }
        let branch = build_tree(board, filters, child, visited);
        tree.push(branch);
    }
    tree
}
