//! Engine facade: filters, collapse, chains, viewport and pointer handling.

use rstest::{fixture, rstest};

use orgchart::application::services::ChartService;
use orgchart::application::ApplicationError;
use orgchart::domain::{
    DomainError, EventDisposition, Filters, LayoutMode, Level, Person, Point, PointerEvent,
    Priority, Readiness, Size, Successor, SuccessorType,
};
use orgchart::util::testing;

fn successor(name: &str) -> Successor {
    Successor {
        name: name.into(),
        kind: SuccessorType::Internal,
        priority: Priority::High,
        readiness: Readiness::ThreeToSixMonths,
        notes: None,
        current_role: None,
    }
}

/// Five people; only `x` lacks a successor.
fn staffed(id: &str, region: &str, manager: Option<&str>) -> Person {
    let p = Person::new(id, id.to_uppercase(), Level::Manager)
        .located(region, "UK")
        .with_successor(successor("bench"));
    match manager {
        Some(m) => p.reporting_to(m),
        None => p,
    }
}

#[fixture]
fn chart() -> ChartService {
    testing::init_test_setup();
    let mut chart = ChartService::default();
    chart.load_hierarchy(
        "corp",
        vec![
            staffed("a", "EMEA", None),
            staffed("b", "EMEA", Some("a")),
            staffed("c", "APAC", Some("a")),
            staffed("d", "APAC", Some("c")),
            Person::new("x", "Xavier", Level::IndividualContributor)
                .located("EMEA", "DE")
                .reporting_to("b"),
        ],
    );
    chart
}

fn ids(people: &[Person]) -> Vec<&str> {
    people.iter().map(|p| p.id.as_str()).collect()
}

#[rstest]
fn given_gap_filter_in_region_when_filtering_then_only_gap_person(mut chart: ChartService) {
    let filters = Filters {
        region: "EMEA".into(),
        succession_gap_only: true,
        ..Filters::default()
    };

    let visible = chart.set_visibility_filter("corp", filters).unwrap();

    assert_eq!(ids(&visible), vec!["x"]);
}

#[rstest]
fn given_gap_filter_in_other_region_when_filtering_then_empty(mut chart: ChartService) {
    let filters = Filters {
        region: "APAC".into(),
        succession_gap_only: true,
        ..Filters::default()
    };

    let visible = chart.set_visibility_filter("corp", filters).unwrap();

    assert!(visible.is_empty());
}

#[rstest]
fn given_country_without_matching_region_when_filtering_then_country_ignored(mut chart: ChartService) {
    let filters = Filters {
        region: "APAC".into(),
        country: "DE".into(),
        ..Filters::default()
    };

    let visible = chart.set_visibility_filter("corp", filters).unwrap();

    assert_eq!(ids(&visible), vec!["c", "d"]);
}

#[rstest]
fn given_same_filters_when_filtering_twice_then_identical(mut chart: ChartService) {
    let filters = Filters {
        search_text: "a".into(),
        ..Filters::default()
    };

    let first = chart.set_visibility_filter("corp", filters.clone()).unwrap();
    let second = chart.set_visibility_filter("corp", filters).unwrap();

    assert_eq!(first, second);
}

#[rstest]
fn given_collapsed_manager_when_expanded_then_reports_return(mut chart: ChartService) {
    assert!(chart.toggle_collapse("corp", "a").unwrap());
    let collapsed: Vec<String> = chart
        .visible("corp")
        .unwrap()
        .iter()
        .map(|p| p.id.clone())
        .collect();
    assert_eq!(collapsed, vec!["a"]);

    assert!(!chart.toggle_collapse("corp", "a").unwrap());
    assert_eq!(chart.visible("corp").unwrap().len(), 5);
}

#[rstest]
fn given_collapsed_people_when_clearing_filters_then_collapse_kept(mut chart: ChartService) {
    chart.toggle_collapse("corp", "c").unwrap();
    chart
        .set_visibility_filter(
            "corp",
            Filters {
                region: "EMEA".into(),
                collapsed_ids: ["c".to_string()].into(),
                ..Filters::default()
            },
        )
        .unwrap();

    let visible = chart.clear_filters("corp").unwrap();

    assert_eq!(ids(&visible), vec!["a", "b", "c", "x"]);
}

#[rstest]
fn given_any_person_when_getting_chain_then_symmetric(chart: ChartService) {
    let board = chart.board("corp").unwrap();
    for n in board.iter() {
        let chain = chart.get_reporting_chain("corp", &n.id).unwrap();
        assert!(chain.contains(&n.id));
        for m in &chain {
            let back = chart.get_reporting_chain("corp", m).unwrap();
            assert!(back.contains(&n.id), "{} in chain of {} but not vice versa", m, n.id);
        }
    }
}

#[rstest]
fn given_leaf_when_getting_chain_then_ancestors_only(chart: ChartService) {
    let chain = chart.get_reporting_chain("corp", "x").unwrap();
    let mut ids: Vec<&str> = chain.iter().map(String::as_str).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "x"]);
}

#[rstest]
#[case(Point::new(0.0, 0.0))]
#[case(Point::new(640.5, -12.25))]
#[case(Point::new(-3000.0, 9999.0))]
fn given_transformed_view_when_round_tripping_point_then_unchanged(mut chart: ChartService, #[case] p: Point) {
    chart.apply_auto_layout("corp").unwrap();
    chart.zoom_in();
    chart.wheel_zoom(-137.0);

    let back = chart.to_viewport_coords(chart.to_model_coords(p));

    assert!((back.x - p.x).abs() < 1e-9);
    assert!((back.y - p.y).abs() < 1e-9);
}

#[rstest]
fn given_many_zoom_steps_when_zooming_then_clamped(mut chart: ChartService) {
    for _ in 0..50 {
        chart.zoom_in();
    }
    assert_eq!(chart.viewport().zoom(), 3.0);
    for _ in 0..50 {
        chart.zoom_out();
    }
    assert_eq!(chart.viewport().zoom(), 0.3);
}

#[rstest]
fn given_laid_out_board_when_fitting_small_viewport_then_everything_on_screen(mut chart: ChartService) {
    chart.set_viewport_size(Size::new(400.0, 300.0));
    chart.apply_auto_layout("corp").unwrap();

    let zoom = chart.viewport().zoom();
    assert!(zoom < 1.0);
    for person in chart.board("corp").unwrap().iter() {
        let corner = chart.to_viewport_coords(person.position.unwrap());
        assert!(corner.x >= 0.0 && corner.x + 240.0 * zoom <= 400.0);
        assert!(corner.y >= 0.0 && corner.y + 120.0 * zoom <= 300.0);
    }
}

#[rstest]
fn given_no_positions_when_fitting_then_view_untouched(mut chart: ChartService) {
    assert!(!chart.fit_to_screen());
    assert_eq!(chart.viewport().zoom(), 1.0);
}

#[rstest]
fn given_manual_mode_when_dragging_node_then_moves_without_relayout(mut chart: ChartService) {
    chart.apply_auto_layout("corp").unwrap();
    chart.reset_view();
    chart.set_mode(LayoutMode::Manual);
    let before_b = chart.board("corp").unwrap().get("b").unwrap().position.unwrap();
    let before_a = chart.board("corp").unwrap().get("a").unwrap().position.unwrap();

    let grab = Point::new(before_b.x + 10.0, before_b.y + 10.0);
    assert_eq!(chart.pointer_down_at(grab), EventDisposition::Consumed);
    chart.handle_pointer(&PointerEvent::Move {
        at: Point::new(grab.x + 75.0, grab.y - 5.0),
    });
    chart.handle_pointer(&PointerEvent::Up {
        at: Point::new(grab.x + 75.0, grab.y - 5.0),
    });

    let board = chart.board("corp").unwrap();
    assert_eq!(board.get("b").unwrap().position, Some(before_b + Point::new(75.0, -5.0)));
    assert_eq!(board.get("a").unwrap().position, Some(before_a));
    assert!(chart.interaction().state().is_idle());
}

#[rstest]
fn given_auto_mode_when_pointer_down_on_node_then_stays_idle(mut chart: ChartService) {
    chart.apply_auto_layout("corp").unwrap();
    chart.reset_view();
    let a = chart.board("corp").unwrap().get("a").unwrap().position.unwrap();

    chart.pointer_down_at(a + Point::new(5.0, 5.0));

    assert_eq!(chart.interaction().state().name(), "idle");
}

#[rstest]
fn given_background_press_when_dragging_then_pans(mut chart: ChartService) {
    chart.reset_view();

    chart.pointer_down_at(Point::new(-500.0, -500.0));
    chart.handle_pointer(&PointerEvent::Move {
        at: Point::new(-450.0, -480.0),
    });
    chart.handle_pointer(&PointerEvent::Up {
        at: Point::new(-450.0, -480.0),
    });

    assert_eq!(chart.viewport().pan(), Point::new(50.0, 20.0));
}

#[rstest]
fn given_drag_in_progress_when_filter_changes_then_drag_cancelled(mut chart: ChartService) {
    chart.apply_auto_layout("corp").unwrap();
    chart.reset_view();
    chart.set_mode(LayoutMode::Manual);
    let start = chart.board("corp").unwrap().get("d").unwrap().position.unwrap();
    chart.pointer_down_at(start + Point::new(1.0, 1.0));
    chart.handle_pointer(&PointerEvent::Move {
        at: Point::new(0.0, 0.0),
    });

    chart.set_visibility_filter("corp", Filters::default()).unwrap();

    assert!(chart.interaction().state().is_idle());
    assert_eq!(chart.board("corp").unwrap().get("d").unwrap().position, Some(start));
}

#[rstest]
fn given_locked_node_when_pressing_on_it_then_no_drag(mut chart: ChartService) {
    chart.apply_auto_layout("corp").unwrap();
    chart.reset_view();
    chart.set_mode(LayoutMode::Manual);
    chart.lock_node("corp", "c");
    let c = chart.board("corp").unwrap().get("c").unwrap().position.unwrap();

    let disposition = chart.pointer_down_at(c + Point::new(1.0, 1.0));

    assert_eq!(disposition, EventDisposition::Ignored);
    assert!(chart.unlock_node("corp", "c"));
}

#[rstest]
fn given_lock_on_one_board_when_dragging_same_id_on_other_board_then_allowed(mut chart: ChartService) {
    chart.load_hierarchy("lab", vec![Person::new("a", "Other Ann", Level::Executive)]);
    chart.apply_auto_layout("lab").unwrap();
    chart.lock_node("corp", "a");
    chart.switch_board("lab").unwrap();
    chart.reset_view();
    chart.set_mode(LayoutMode::Manual);

    let disposition = chart.pointer_down_at(Point::new(60.0, 60.0));

    assert_eq!(disposition, EventDisposition::Consumed);
    assert_eq!(chart.interaction().state().name(), "dragging");
    assert!(chart.interaction().is_locked("corp", "a"));
    assert!(!chart.interaction().is_locked("lab", "a"));
}

#[rstest]
fn given_hovered_person_when_entering_then_chain_highlighted(mut chart: ChartService) {
    chart.hover_enter("d");
    assert!(chart.highlighted().contains("a"));
    assert!(chart.highlighted().contains("c"));
    assert!(!chart.highlighted().contains("b"));

    chart.hover_leave();
    assert!(chart.highlighted().is_empty());
}

#[rstest]
fn given_hovered_person_when_removed_then_highlight_cleared(mut chart: ChartService) {
    chart.hover_enter("d");

    chart.remove_node("corp", "d").unwrap();

    assert!(chart.highlighted().is_empty());
    assert_eq!(chart.interaction().hovered(), None);
}

#[rstest]
fn given_hovered_manager_when_report_removed_then_highlight_recomputed(mut chart: ChartService) {
    chart.hover_enter("c");
    assert!(chart.highlighted().contains("d"));

    chart.remove_node("corp", "d").unwrap();

    let expected: std::collections::HashSet<String> = ["a", "c"].into_iter().map(String::from).collect();
    assert_eq!(chart.highlighted(), &expected);
    assert_eq!(chart.interaction().hovered(), Some("c"));
}

#[rstest]
fn given_hovered_person_when_board_reloaded_without_them_then_highlight_cleared(mut chart: ChartService) {
    chart.hover_enter("x");

    chart.load_hierarchy("corp", vec![Person::new("a", "Ann", Level::Executive)]);

    assert!(chart.highlighted().is_empty());
}

#[rstest]
fn given_removed_manager_when_removing_then_reports_become_roots(mut chart: ChartService) {
    let placed = chart.remove_node("corp", "c").unwrap();

    assert_eq!(placed.len(), 4);
    let board = chart.board("corp").unwrap();
    assert_eq!(board.get("d").unwrap().reports_to, None);
    assert_eq!(board.get("d").unwrap().position.map(|p| p.y), Some(50.0));
}

#[rstest]
fn given_self_reporting_person_when_upserting_then_invalid_entity(mut chart: ChartService) {
    let err = chart
        .upsert_node("corp", Person::new("z", "Zed", Level::Manager).reporting_to("z"))
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidEntity { .. })
    ));
}

#[rstest]
fn given_self_manager_when_reparenting_then_invalid_entity_and_unchanged(mut chart: ChartService) {
    let err = chart.set_reports_to("corp", "b", Some("b")).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidEntity { .. })
    ));
    let board = chart.board("corp").unwrap();
    assert_eq!(board.get("b").unwrap().reports_to.as_deref(), Some("a"));
}

#[rstest]
fn given_unknown_node_when_updating_position_then_error(mut chart: ChartService) {
    let err = chart
        .update_node_position("corp", "ghost", Point::ORIGIN)
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UnknownNode { .. })
    ));
}

#[rstest]
fn given_second_board_when_switching_then_hit_testing_uses_it(mut chart: ChartService) {
    chart.load_hierarchy("lab", vec![Person::new("l", "Lab", Level::Executive)]);
    chart.apply_auto_layout("lab").unwrap();
    chart.switch_board("lab").unwrap();
    chart.reset_view();

    assert_eq!(chart.active_board(), Some("lab"));
    assert_eq!(chart.node_at(Point::new(60.0, 60.0)).as_deref(), Some("l"));
    assert_eq!(chart.node_at(Point::new(10.0, 10.0)), None);
    assert!(chart.switch_board("nope").is_err());
}

#[rstest]
fn given_filtered_board_when_exporting_then_snapshot_has_visible_people(mut chart: ChartService) {
    chart
        .set_visibility_filter(
            "corp",
            Filters {
                region: "APAC".into(),
                ..Filters::default()
            },
        )
        .unwrap();
    chart.apply_auto_layout("corp").unwrap();

    let export = chart.export_board("corp").unwrap();

    assert_eq!(export.board, "corp");
    assert_eq!(ids(&export.people), vec!["c", "d"]);
    assert!(export.people.iter().all(|p| p.position.is_some()));
}

#[rstest]
fn given_new_report_when_upserting_then_laid_out_under_manager(mut chart: ChartService) {
    let placed = chart
        .upsert_node("corp", Person::new("e", "Eve", Level::Manager).reporting_to("d"))
        .unwrap();

    assert_eq!(placed.len(), 6);
    let board = chart.board("corp").unwrap();
    assert_eq!(board.get("e").unwrap().position.map(|p| p.y), Some(650.0));
}

#[rstest]
fn given_reparented_person_when_setting_manager_then_moves_to_new_subtree(mut chart: ChartService) {
    chart.set_reports_to("corp", "d", Some("b")).unwrap();

    let board = chart.board("corp").unwrap();
    let siblings: Vec<&str> = board.children("b").iter().map(|p| p.id.as_str()).collect();
    assert_eq!(siblings, vec!["d", "x"]);
    assert!(board.children("c").is_empty());
}

#[rstest]
fn given_person_when_focusing_then_centered_in_viewport(mut chart: ChartService) {
    chart.apply_auto_layout("corp").unwrap();
    chart.set_viewport_size(Size::new(800.0, 600.0));

    chart.focus_on("d").unwrap();

    let d = chart.board("corp").unwrap().get("d").unwrap().position.unwrap();
    let zoom = chart.viewport().zoom();
    let center = chart.to_viewport_coords(d + Point::new(120.0, 60.0));
    assert!((center.x - 400.0).abs() < 1e-9, "zoom {zoom}");
    assert!((center.y - 300.0).abs() < 1e-9);
}
