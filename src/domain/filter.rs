//! Visibility filter: attribute filters plus collapse-aware pruning.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::arena::BoardArena;
use crate::domain::entities::{NodeId, Person};

/// Wildcard value for the region and country filters.
pub const ALL: &str = "all";

/// Filter selection for one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filters {
    pub region: String,
    pub country: String,
    pub search_text: String,
    pub succession_gap_only: bool,
    pub collapsed_ids: BTreeSet<NodeId>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            region: ALL.to_string(),
            country: ALL.to_string(),
            search_text: String::new(),
            succession_gap_only: false,
            collapsed_ids: BTreeSet::new(),
        }
    }
}

impl Filters {
    /// Flip the collapsed state of `id`; returns true if it is now collapsed.
    pub fn toggle_collapsed(&mut self, id: &str) -> bool {
        if self.collapsed_ids.remove(id) {
            false
        } else {
            self.collapsed_ids.insert(id.to_string());
            true
        }
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed_ids.contains(id)
    }

    /// Reset region, country, search and gap filters. Collapsed nodes stay collapsed.
    pub fn clear_attributes(&mut self) {
        let collapsed = std::mem::take(&mut self.collapsed_ids);
        *self = Self {
            collapsed_ids: collapsed,
            ..Self::default()
        };
    }

    /// True when no attribute filter narrows the board.
    pub fn is_unfiltered(&self) -> bool {
        self.region == ALL
            && self.country == ALL
            && self.search_text.is_empty()
            && !self.succession_gap_only
    }

    /// Country filter to apply, or `None` when it is ignored.
    ///
    /// A country only applies together with a concrete region that actually
    /// contains it on this board.
    pub fn effective_country<'f>(&'f self, board: &BoardArena) -> Option<&'f str> {
        if self.country == ALL || self.region == ALL {
            return None;
        }
        let consistent = board
            .iter()
            .any(|p| p.region == self.region && p.country == self.country);
        consistent.then_some(self.country.as_str())
    }
}

/// Attribute part of the filter for a single person.
pub fn matches_attributes(person: &Person, filters: &Filters, country: Option<&str>) -> bool {
    let region_ok = filters.region == ALL || person.region == filters.region;
    let country_ok = country.map_or(true, |c| person.country == c);
    let search_ok = filters.search_text.is_empty() || {
        let needle = filters.search_text.to_lowercase();
        person.name.to_lowercase().contains(&needle) || person.title.to_lowercase().contains(&needle)
    };
    let gap_ok = !filters.succession_gap_only || person.has_succession_gap();

    region_ok && country_ok && search_ok && gap_ok
}

/// True if some manager above `id` is collapsed. The node itself does not count.
pub fn hidden_by_collapse(board: &BoardArena, filters: &Filters, id: &str) -> bool {
    if filters.collapsed_ids.is_empty() {
        return false;
    }
    board
        .ancestor_chain(id)
        .iter()
        .skip(1)
        .any(|ancestor| filters.is_collapsed(&ancestor.id))
}

/// People passing both the attribute filter and the collapse filter, in board order.
#[instrument(level = "debug", skip(board, filters), fields(board = board.name()))]
pub fn compute_visible<'a>(board: &'a BoardArena, filters: &Filters) -> Vec<&'a Person> {
    if filters.is_unfiltered() && filters.collapsed_ids.is_empty() {
        trace!(total = board.len(), "no filters, everyone visible");
        return board.iter().collect();
    }

    let country = filters.effective_country(board);
    if filters.country != ALL && country.is_none() {
        debug!(country = %filters.country, region = %filters.region, "country filter ignored");
    }

    let visible: Vec<&Person> = board
        .iter()
        .filter(|p| matches_attributes(p, filters, country))
        .filter(|p| !hidden_by_collapse(board, filters, &p.id))
        .collect();

    debug!(total = board.len(), visible = visible.len(), "computed visible set");
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Level, Priority, Readiness, Successor, SuccessorType};
    use rstest::rstest;

    fn successor() -> Successor {
        Successor {
            name: "Heir".into(),
            kind: SuccessorType::Internal,
            priority: Priority::High,
            readiness: Readiness::ZeroToThreeMonths,
            notes: None,
            current_role: None,
        }
    }

    fn board() -> BoardArena {
        BoardArena::from_people(
            "global",
            vec![
                Person::new("ceo", "Grace Hopper", Level::Executive)
                    .with_title("Chief Executive")
                    .located("AMER", "US")
                    .with_successor(successor()),
                Person::new("emea", "Alan Turing", Level::SeniorLeader)
                    .with_title("Head of EMEA")
                    .located("EMEA", "UK")
                    .reporting_to("ceo")
                    .with_successor(successor()),
                Person::new("de", "Emmy Noether", Level::Manager)
                    .with_title("Country Lead")
                    .located("EMEA", "DE")
                    .reporting_to("emea"),
                Person::new("apac", "Kenji Sato", Level::SeniorLeader)
                    .located("APAC", "JP")
                    .reporting_to("ceo")
                    .with_successor(successor()),
                Person::new("dev", "Ada Lovelace", Level::IndividualContributor)
                    .with_title("Engineer")
                    .located("EMEA", "UK")
                    .reporting_to("de")
                    .with_successor(successor()),
            ],
        )
    }

    fn ids<'a>(people: &[&'a Person]) -> Vec<&'a str> {
        people.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn given_default_filters_when_computing_then_everything_visible() {
        let board = board();
        let visible = compute_visible(&board, &Filters::default());
        assert_eq!(visible.len(), 5);
    }

    #[rstest]
    #[case("EMEA", vec!["de"])]
    #[case("APAC", vec![])]
    fn given_region_and_gap_filter_when_computing_then_returns_gap_nodes_in_region(
        #[case] region: &str,
        #[case] expected: Vec<&str>,
    ) {
        let board = board();
        let filters = Filters {
            region: region.into(),
            succession_gap_only: true,
            ..Filters::default()
        };

        let visible = compute_visible(&board, &filters);

        assert_eq!(ids(&visible), expected);
    }

    #[rstest]
    #[case("alan", vec!["emea"])]
    #[case("ENGINEER", vec!["dev"])]
    #[case("lead", vec!["de"])]
    #[case("nobody", vec![])]
    fn given_search_text_when_computing_then_matches_name_or_title_case_insensitive(
        #[case] search: &str,
        #[case] expected: Vec<&str>,
    ) {
        let board = board();
        let filters = Filters {
            search_text: search.into(),
            ..Filters::default()
        };
        assert_eq!(ids(&compute_visible(&board, &filters)), expected);
    }

    #[test]
    fn given_country_without_region_when_computing_then_country_ignored() {
        let board = board();
        let filters = Filters {
            country: "UK".into(),
            ..Filters::default()
        };
        assert_eq!(compute_visible(&board, &filters).len(), 5);
    }

    #[test]
    fn given_country_outside_region_when_computing_then_country_ignored() {
        let board = board();
        let filters = Filters {
            region: "EMEA".into(),
            country: "JP".into(),
            ..Filters::default()
        };
        assert_eq!(ids(&compute_visible(&board, &filters)), vec!["emea", "de", "dev"]);
    }

    #[test]
    fn given_consistent_country_when_computing_then_country_applied() {
        let board = board();
        let filters = Filters {
            region: "EMEA".into(),
            country: "UK".into(),
            ..Filters::default()
        };
        assert_eq!(ids(&compute_visible(&board, &filters)), vec!["emea", "dev"]);
    }

    #[test]
    fn given_collapsed_manager_when_computing_then_descendants_hidden_and_restored() {
        let board = board();
        let mut filters = Filters::default();

        assert!(filters.toggle_collapsed("emea"));
        let collapsed = compute_visible(&board, &filters);
        assert_eq!(ids(&collapsed), vec!["ceo", "emea", "apac"]);
        assert_eq!(board.direct_report_count("emea"), 1);

        assert!(!filters.toggle_collapsed("emea"));
        assert_eq!(compute_visible(&board, &filters).len(), 5);
    }

    #[test]
    fn given_same_filters_when_computing_twice_then_identical() {
        let board = board();
        let mut filters = Filters {
            region: "EMEA".into(),
            ..Filters::default()
        };
        filters.toggle_collapsed("de");

        let first = ids(&compute_visible(&board, &filters));
        let second = ids(&compute_visible(&board, &filters));
        assert_eq!(first, second);
    }

    #[test]
    fn given_attribute_filters_when_clearing_then_collapse_state_kept() {
        let mut filters = Filters {
            region: "EMEA".into(),
            search_text: "x".into(),
            succession_gap_only: true,
            ..Filters::default()
        };
        filters.toggle_collapsed("ceo");

        filters.clear_attributes();

        assert!(filters.is_unfiltered());
        assert!(filters.is_collapsed("ceo"));
    }
}
