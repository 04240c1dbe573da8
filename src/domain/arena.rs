//! Arena-based storage for one board's reporting forest.
//!
//! People live in a generational arena and are looked up by their stable id,
//! never by position. Manager links are kept as ids (`Person::reports_to`);
//! a secondary index maps each manager id to its direct reports in board order,
//! so dangling references stay representable.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use tracing::{instrument, warn};

use crate::domain::entities::{NodeId, Person, Point};
use crate::domain::error::DomainError;

/// Person stored in the arena together with its board-order sequence number.
#[derive(Debug)]
pub struct BoardNode {
    pub person: Person,
    seq: u64,
}

/// Flat id -> person map for one board.
///
/// Structural changes (`reports_to`, deletion) go through accessor methods
/// so the child index never drifts from the records.
#[derive(Debug)]
pub struct BoardArena {
    name: String,
    arena: Arena<BoardNode>,
    ids: HashMap<NodeId, Index>,
    /// Direct reports per manager id, sorted by `seq`
    children: HashMap<NodeId, Vec<Index>>,
    /// All nodes in board order
    order: Vec<Index>,
    next_seq: u64,
}

impl BoardArena {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: Arena::new(),
            ids: HashMap::new(),
            children: HashMap::new(),
            order: Vec::new(),
            next_seq: 0,
        }
    }

    /// Build a board from a flat list of people, keeping their order.
    ///
    /// Later duplicates of an id replace earlier ones in place.
    pub fn from_people(name: impl Into<String>, people: Vec<Person>) -> Self {
        let mut board = Self::new(name);
        for person in people {
            board.insert_node(person);
        }
        board
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Insert a person, or replace the record with the same id.
    ///
    /// A replaced record keeps its place in board order.
    #[instrument(level = "trace", skip(self, person), fields(id = %person.id))]
    pub fn insert_node(&mut self, person: Person) -> Index {
        if let Some(&idx) = self.ids.get(&person.id) {
            let new_manager = person.reports_to.clone();
            if let Some(node) = self.arena.get_mut(idx) {
                let old_manager = node.person.reports_to.clone();
                node.person = person;
                if old_manager != new_manager {
                    self.unlink_child(old_manager.as_deref(), idx);
                    self.link_child(new_manager.as_deref(), idx);
                }
            }
            return idx;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = person.id.clone();
        let manager = person.reports_to.clone();
        let idx = self.arena.insert(BoardNode { person, seq });
        self.ids.insert(id, idx);
        self.order.push(idx);
        self.link_child(manager.as_deref(), idx);
        idx
    }

    /// Remove a person. Direct reports are orphaned (their `reports_to` is
    /// cleared), never deleted.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: &str) -> Option<Person> {
        let idx = self.ids.remove(id)?;
        let removed = self.arena.remove(idx)?;
        self.order.retain(|&i| i != idx);
        self.unlink_child(removed.person.reports_to.as_deref(), idx);

        for orphan in self.children.remove(id).unwrap_or_default() {
            if let Some(node) = self.arena.get_mut(orphan) {
                node.person.reports_to = None;
            }
        }
        Some(removed.person)
    }

    /// Re-parent a person. No cycle check is enforced; closing a cycle is
    /// logged and left to the traversal guards.
    #[instrument(level = "debug", skip(self))]
    pub fn set_reports_to(&mut self, id: &str, manager: Option<&str>) -> Result<(), DomainError> {
        let idx = self.index_of(id)?;
        if manager.is_some_and(|m| self.closes_cycle(id, m)) {
            warn!(board = %self.name, id, ?manager, "reports_to change closes a cycle");
        }
        let Some(node) = self.arena.get_mut(idx) else {
            return Err(self.unknown(id));
        };
        let old = std::mem::replace(&mut node.person.reports_to, manager.map(str::to_string));
        self.unlink_child(old.as_deref(), idx);
        self.link_child(manager, idx);
        Ok(())
    }

    /// Overwrite a person's layout position.
    pub fn set_position(&mut self, id: &str, position: Point) -> Result<(), DomainError> {
        let idx = self.index_of(id)?;
        let Some(node) = self.arena.get_mut(idx) else {
            return Err(self.unknown(id));
        };
        node.person.position = Some(position);
        Ok(())
    }

    /// Put back an earlier position, including "never placed".
    pub fn restore_position(&mut self, id: &str, position: Option<Point>) -> Result<(), DomainError> {
        let idx = self.index_of(id)?;
        let Some(node) = self.arena.get_mut(idx) else {
            return Err(self.unknown(id));
        };
        node.person.position = position;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.ids
            .get(id)
            .and_then(|&idx| self.arena.get(idx))
            .map(|node| &node.person)
    }

    /// All people in board order.
    pub fn iter(&self) -> impl Iterator<Item = &Person> + '_ {
        self.order
            .iter()
            .filter_map(|&idx| self.arena.get(idx))
            .map(|node| &node.person)
    }

    /// Owned snapshot of all records in board order.
    pub fn to_people(&self) -> Vec<Person> {
        self.iter().cloned().collect()
    }

    /// Direct reports of `manager_id`, in board order.
    #[instrument(level = "trace", skip(self))]
    pub fn children(&self, manager_id: &str) -> Vec<&Person> {
        self.children
            .get(manager_id)
            .map(|kids| {
                kids.iter()
                    .filter_map(|&idx| self.arena.get(idx))
                    .map(|node| &node.person)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of direct reports regardless of any visibility filter.
    pub fn direct_report_count(&self, manager_id: &str) -> usize {
        self.children.get(manager_id).map_or(0, Vec::len)
    }

    /// People with no manager.
    #[instrument(level = "trace", skip(self))]
    pub fn roots(&self) -> Vec<&Person> {
        self.iter().filter(|p| p.reports_to.is_none()).collect()
    }

    /// People whose manager is unset or missing from the board.
    pub fn traversal_roots(&self) -> Vec<&Person> {
        self.iter()
            .filter(|p| p.reports_to.as_deref().map_or(true, |m| !self.contains(m)))
            .collect()
    }

    /// The person followed by each manager up to the topmost root.
    ///
    /// Stops at a missing manager (broken reference) and at the first
    /// revisited id, so cyclic data terminates. Unknown ids yield an empty chain.
    #[instrument(level = "trace", skip(self))]
    pub fn ancestor_chain(&self, id: &str) -> Vec<&Person> {
        let mut chain = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = self.get(id);

        while let Some(person) = current {
            if !visited.insert(person.id.as_str()) {
                warn!(board = %self.name, id = %person.id, "cycle in reporting chain");
                break;
            }
            chain.push(person);
            current = person.reports_to.as_deref().and_then(|m| self.get(m));
        }
        chain
    }

    /// All transitive reports of `id` (pre-order, excluding `id`).
    #[instrument(level = "trace", skip(self))]
    pub fn descendants(&self, id: &str) -> Vec<&Person> {
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        if let Some(person) = self.get(id) {
            visited.insert(person.id.as_str());
            self.collect_descendants(person.id.as_str(), &mut visited, &mut out);
        }
        out
    }

    fn collect_descendants<'a>(
        &'a self,
        id: &str,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<&'a Person>,
    ) {
        for child in self.children(id) {
            if !visited.insert(child.id.as_str()) {
                continue;
            }
            out.push(child);
            self.collect_descendants(child.id.as_str(), visited, out);
        }
    }

    /// Ancestors, the node itself and all transitive reports.
    ///
    /// Empty when `id` is not part of the board.
    #[instrument(level = "debug", skip(self))]
    pub fn reporting_chain(&self, id: &str) -> HashSet<NodeId> {
        let mut chain: HashSet<NodeId> = self
            .ancestor_chain(id)
            .into_iter()
            .map(|p| p.id.clone())
            .collect();
        chain.extend(self.descendants(id).into_iter().map(|p| p.id.clone()));
        chain
    }

    /// True if making `manager` the manager of `id` would make `id` its own ancestor.
    pub fn closes_cycle(&self, id: &str, manager: &str) -> bool {
        manager == id || self.ancestor_chain(manager).iter().any(|p| p.id == id)
    }

    /// Pre-order walk over every tree of the board, roots in board order.
    /// People stranded in a reporting cycle start extra trees afterwards.
    pub fn iter_preorder(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    fn index_of(&self, id: &str) -> Result<Index, DomainError> {
        self.ids.get(id).copied().ok_or_else(|| self.unknown(id))
    }

    fn unknown(&self, id: &str) -> DomainError {
        DomainError::UnknownNode {
            board: self.name.clone(),
            id: id.to_string(),
        }
    }

    fn seq_of(&self, idx: Index) -> u64 {
        self.arena.get(idx).map_or(u64::MAX, |n| n.seq)
    }

    fn link_child(&mut self, manager: Option<&str>, idx: Index) {
        let Some(manager) = manager else { return };
        let seq = self.seq_of(idx);
        let seqs: Vec<u64> = self
            .children
            .get(manager)
            .map(|kids| kids.iter().map(|&k| self.seq_of(k)).collect())
            .unwrap_or_default();
        let pos = seqs.partition_point(|&s| s < seq);
        self.children
            .entry(manager.to_string())
            .or_default()
            .insert(pos, idx);
    }

    fn unlink_child(&mut self, manager: Option<&str>, idx: Index) {
        let Some(manager) = manager else { return };
        if let Some(kids) = self.children.get_mut(manager) {
            kids.retain(|&k| k != idx);
            if kids.is_empty() {
                self.children.remove(manager);
            }
        }
    }
}

/// Depth-first, left-to-right walk yielding `(depth, person)`.
///
/// Every person is yielded exactly once.
pub struct PreOrderIterator<'a> {
    board: &'a BoardArena,
    stack: Vec<(usize, &'a Person)>,
    visited: HashSet<&'a str>,
    /// Board-order cursor for people no root reaches
    rest: usize,
}

impl<'a> PreOrderIterator<'a> {
    fn new(board: &'a BoardArena) -> Self {
        let mut stack: Vec<(usize, &'a Person)> =
            board.traversal_roots().into_iter().map(|p| (0, p)).collect();
        // Push roots in reverse order for left-to-right traversal
        stack.reverse();
        Self {
            board,
            stack,
            visited: HashSet::new(),
            rest: 0,
        }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (usize, &'a Person);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some((depth, person)) = self.stack.pop() {
                if !self.visited.insert(person.id.as_str()) {
                    continue;
                }
                for child in self.board.children(&person.id).into_iter().rev() {
                    self.stack.push((depth + 1, child));
                }
                return Some((depth, person));
            }
            let stranded = self
                .board
                .iter()
                .skip(self.rest)
                .position(|p| !self.visited.contains(p.id.as_str()))?;
            self.rest += stranded;
            let person = self.board.iter().nth(self.rest)?;
            self.stack.push((0, person));
        }
    }
}
