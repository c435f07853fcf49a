use crux_core::testing::AppTester;
use wellmap_core::capabilities::{BridgeOperation, FramePresented, MapOperation};
use wellmap_core::marker::{MarkerId, MarkerPayload};
use wellmap_core::{App, Effect, Event, Model, DETAIL_PLACEHOLDER};

fn payload(id: &str, name: &str, color: Option<&str>, files: &[&str]) -> MarkerPayload {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "lat": 59.9,
        "lng": 30.3,
        "name": name,
        "deep": "120",
        "color": color,
        "fileNames": files,
    }))
    .unwrap()
}

/// Runs every pending frame so the view snapshots are fresh.
fn settle_frames(app: &AppTester<App, Effect>, model: &mut Model, effects: Vec<Effect>) {
    let mut frames: Vec<_> = effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::Frame(req) => Some(req),
            _ => None,
        })
        .collect();
    while let Some(mut frame) = frames.pop() {
        let tick = app.resolve(&mut frame, FramePresented).expect("frame resolves");
        for event in tick.events {
            let update = app.update(event, model);
            frames.extend(update.effects.into_iter().filter_map(|e| match e {
                Effect::Frame(req) => Some(req),
                _ => None,
            }));
        }
    }
}

fn startup(app: &AppTester<App, Effect>, markers: Vec<MarkerPayload>) -> Model {
    let mut model = Model::default();
    let update = app.update(
        Event::BridgeConnected { initial_markers: markers, now_ms: 0 },
        &mut model,
    );
    settle_frames(app, &mut model, update.effects);
    model
}

#[test]
fn startup_builds_the_color_tree_in_first_seen_order() {
    let app = AppTester::<App, Effect>::default();
    let model = startup(
        &app,
        vec![
            payload("1", "w-1", Some("#e63946"), &["a.docx"]),
            payload("2", "w-2", None, &[]),
            payload("3", "w-3", Some("#e63946"), &["b.docx", "c.docx"]),
        ],
    );

    let view = app.view(&model);
    assert_eq!(view.markers.len(), 3);
    assert_eq!(view.nav_tree.groups.len(), 2);

    let red = &view.nav_tree.groups[0];
    assert_eq!(red.color.as_str(), "#e63946");
    assert_eq!((red.marker_count, red.file_count), (2, 3));

    let default = &view.nav_tree.groups[1];
    assert_eq!(default.color.as_str(), wellmap_core::DEFAULT_MARKER_COLOR);

    assert_eq!(view.selected.entries.len(), 0);
    assert!(view.selected.empty_text.is_some());
    assert!(view.detail.is_none());
    assert_eq!(view.detail_placeholder, DETAIL_PLACEHOLDER);
}

#[test]
fn tree_entry_click_pans_selects_and_fills_the_detail_panel() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(&app, vec![payload("1", "w-1", Some("#e63946"), &["a.docx"])]);

    let id = MarkerId::from("1");
    let update = app.update(Event::TreeEntryClicked { id: id.clone() }, &mut model);
    let focused = update.effects.iter().any(|e| match e {
        Effect::Map(req) => matches!(&req.operation, MapOperation::FocusMarker { id: f, .. } if f == &id),
        _ => false,
    });
    assert!(focused, "tree click pans the map to the marker");
    settle_frames(&app, &mut model, update.effects);

    assert!(model.selection.contains(&id));
    let view = app.view(&model);
    let detail = view.detail.expect("detail panel filled");
    assert_eq!(detail.name, "w-1");
    assert_eq!(detail.deep, "120");
    assert_eq!(detail.files, vec!["a.docx"]);
    assert_eq!(view.selected.entries.len(), 1);

    // A map click on the same marker toggles it back off; detail keeps
    // pointing at the marker.
    let update = app.update(Event::MarkerClicked { id: id.clone() }, &mut model);
    settle_frames(&app, &mut model, update.effects);
    assert!(!model.selection.contains(&id));
    assert!(app.view(&model).detail.is_some());
}

#[test]
fn removal_round_trips_through_the_host() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(
        &app,
        vec![
            payload("1", "w-1", Some("#e63946"), &[]),
            payload("2", "w-2", Some("#e63946"), &[]),
        ],
    );
    let id = MarkerId::from("1");
    let update = app.update(Event::MarkerClicked { id: id.clone() }, &mut model);
    settle_frames(&app, &mut model, update.effects);

    // The request only relays; nothing changes until the host acknowledges.
    let update = app.update(Event::RemoveSelectedRequested, &mut model);
    let relayed = update.effects.iter().any(|e| match e {
        Effect::Bridge(req) => req.operation == BridgeOperation::RemovePoint { id: id.clone() },
        _ => false,
    });
    assert!(relayed);
    assert!(model.registry.contains(&id));

    let update = app.update(Event::PointRemoved { id: id.clone() }, &mut model);
    settle_frames(&app, &mut model, update.effects);

    assert!(!model.registry.contains(&id));
    assert!(!model.selection.contains(&id));
    let view = app.view(&model);
    assert!(view.detail.is_none(), "detail cleared when its marker goes away");
    assert_eq!(view.nav_tree.groups[0].marker_count, 1);
}

#[test]
fn unknown_host_events_change_nothing() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(&app, vec![payload("1", "w-1", None, &[])]);

    app.update(Event::PointRemoved { id: MarkerId::from("ghost") }, &mut model);
    app.update(
        Event::PointUpdated(Box::new(payload("ghost", "x", None, &[]))),
        &mut model,
    );
    assert_eq!(model.registry.len(), 1);
}

#[test]
fn update_refreshes_detail_for_a_selected_marker() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(&app, vec![payload("1", "w-1", None, &[])]);
    let id = MarkerId::from("1");
    let update = app.update(Event::MarkerClicked { id: id.clone() }, &mut model);
    settle_frames(&app, &mut model, update.effects);

    let update = app.update(
        Event::PointUpdated(Box::new(payload("1", "w-1 (ремонт)", None, &["отчет.docx"]))),
        &mut model,
    );
    settle_frames(&app, &mut model, update.effects);

    let detail = app.view(&model).detail.expect("detail still shown");
    assert_eq!(detail.name, "w-1 (ремонт)");
    assert_eq!(detail.files, vec!["отчет.docx"]);
}

#[test]
fn search_narrows_visibility_and_clearing_restores_it() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(
        &app,
        vec![
            payload("1", "Скважина-1", None, &[]),
            payload("2", "Опора", None, &[]),
        ],
    );

    let update = app.update(Event::SearchSubmitted { query: "скваж".into() }, &mut model);
    settle_frames(&app, &mut model, update.effects);

    let view = app.view(&model);
    assert!(view.search.visible);
    assert_eq!(view.search.results.len(), 1);
    let visible: Vec<bool> = view.markers.iter().map(|m| m.visible).collect();
    assert_eq!(visible, vec![true, false]);

    let update = app.update(Event::SearchSubmitted { query: "  ".into() }, &mut model);
    settle_frames(&app, &mut model, update.effects);

    let view = app.view(&model);
    assert!(!view.search.visible);
    assert!(view.markers.iter().all(|m| m.visible));
}

#[test]
fn group_visibility_toggles_between_hide_all_and_show_all() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(
        &app,
        vec![
            payload("1", "w-1", Some("#e63946"), &[]),
            payload("2", "w-2", Some("#e63946"), &[]),
        ],
    );

    // Mixed visibility: toggle shows all.
    let update = app.update(Event::VisibilityToggled { id: MarkerId::from("1") }, &mut model);
    settle_frames(&app, &mut model, update.effects);
    let update = app.update(
        Event::GroupVisibilityToggled { color: "#e63946".into() },
        &mut model,
    );
    settle_frames(&app, &mut model, update.effects);
    assert!(app.view(&model).markers.iter().all(|m| m.visible));

    // All visible: toggle hides all.
    let update = app.update(
        Event::GroupVisibilityToggled { color: "#e63946".into() },
        &mut model,
    );
    settle_frames(&app, &mut model, update.effects);
    assert!(app.view(&model).markers.iter().all(|m| !m.visible));
}

#[test]
fn collapse_state_survives_rebuilds_and_prunes_dead_colors() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(
        &app,
        vec![
            payload("1", "w-1", Some("#e63946"), &[]),
            payload("2", "w-2", Some("#457b9d"), &[]),
        ],
    );

    let update = app.update(
        Event::GroupCollapseToggled { color: "#e63946".into() },
        &mut model,
    );
    settle_frames(&app, &mut model, update.effects);
    assert!(app.view(&model).nav_tree.groups[0].collapsed);

    // An unrelated mutation rebuilds the tree; the group stays collapsed.
    let update = app.update(
        Event::PointAdded(Box::new(payload("3", "w-3", Some("#e63946"), &[]))),
        &mut model,
    );
    settle_frames(&app, &mut model, update.effects);
    assert!(app.view(&model).nav_tree.groups[0].collapsed);

    // The collapsed color disappears entirely; its state is pruned.
    for id in ["1", "3"] {
        let update = app.update(Event::PointRemoved { id: MarkerId::from(id) }, &mut model);
        settle_frames(&app, &mut model, update.effects);
    }
    assert!(model.views.collapsed_groups.is_empty());
}

#[test]
fn bridge_calls_degrade_to_notices_without_a_host() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::Started { now_ms: 0 }, &mut model);

    app.update(Event::MapClicked { lat: 59.9, lng: 30.3 }, &mut model);
    assert_eq!(model.notice.as_deref(), Some(wellmap_core::NOTICE_BRIDGE_UNAVAILABLE));

    app.update(Event::NoticeDismissed, &mut model);
    assert!(model.notice.is_none());

    app.update(Event::OpenFileRequested { file_name: "a.docx".into() }, &mut model);
    assert_eq!(
        model.notice.as_deref(),
        Some(wellmap_core::NOTICE_OPEN_FILE_UNAVAILABLE)
    );
}

#[test]
fn select_all_and_clear_drive_the_selected_list() {
    let app = AppTester::<App, Effect>::default();
    let mut model = startup(
        &app,
        vec![
            payload("1", "w-1", None, &[]),
            payload("2", "w-2", None, &[]),
        ],
    );

    let update = app.update(Event::SelectAll, &mut model);
    settle_frames(&app, &mut model, update.effects);
    assert_eq!(app.view(&model).selected.entries.len(), 2);

    let update = app.update(Event::ClearSelection, &mut model);
    settle_frames(&app, &mut model, update.effects);
    let view = app.view(&model);
    assert!(view.selected.entries.is_empty());
    assert_eq!(view.selected.empty_text.as_deref(), Some(wellmap_core::SELECTED_LIST_EMPTY));
}
