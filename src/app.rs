//! The engine itself: pure `update` over `Model`, side effects through
//! capabilities only.

use tracing::{debug, error, warn};

use crate::capabilities::{BridgeOutput, BridgeResult, Capabilities, ProbeOutcome};
use crate::event::Event;
use crate::marker::{ColorToken, MarkerId, MarkerPayload, UpdateOutcome};
use crate::model::Model;
use crate::render::{self, ViewModel, ViewSlot};
use crate::sync;
use crate::tiles::{self, TileImage, TileKey, TileMode};
use crate::{
    COLOR_SYNC_QUIET_MS, CONNECTIVITY_POLL_MS, NOTICE_BRIDGE_UNAVAILABLE,
    NOTICE_OPEN_FILE_UNAVAILABLE, NOTICE_OPEN_LOCATION_UNAVAILABLE, NOTICE_SELECT_FIRST,
    NOTICE_SYNC_DROPPED, PROBE_TIMEOUT_MS, PROBE_URL,
};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::Started { now_ms } => Self::start(model, caps, now_ms),
            Event::BridgeConnected { initial_markers, now_ms } => {
                model.bridge_ready = true;
                Self::start(model, caps, now_ms);
                Self::ingest_initial(model, caps, initial_markers);
            }

            Event::PointAdded(payload) => Self::add_marker(model, caps, *payload),
            Event::PointUpdated(payload) => Self::update_marker(model, caps, *payload),
            Event::PointRemoved { id } => Self::remove_marker(model, caps, &id),

            Event::MapClicked { lat, lng } => {
                if model.bridge_ready {
                    caps.bridge.add_point(lat, lng);
                } else {
                    Self::notice(model, caps, NOTICE_BRIDGE_UNAVAILABLE);
                }
            }
            Event::MarkerClicked { id } => Self::focus_and_toggle(model, caps, &id, false),
            Event::TreeEntryClicked { id } => Self::focus_and_toggle(model, caps, &id, true),
            Event::SearchResultChosen { id } => {
                model.views.search.visible = false;
                Self::focus_and_toggle(model, caps, &id, true);
            }

            Event::SelectAll => {
                model.selection.select_all(model.registry.ids());
                Self::invalidate(model, caps, ViewSlot::NavTree);
                Self::invalidate(model, caps, ViewSlot::SelectedList);
            }
            Event::ClearSelection => {
                model.selection.clear();
                Self::invalidate(model, caps, ViewSlot::NavTree);
                Self::invalidate(model, caps, ViewSlot::SelectedList);
            }
            Event::RemoveSelectedRequested => {
                if !model.bridge_ready {
                    Self::notice(model, caps, NOTICE_BRIDGE_UNAVAILABLE);
                    return;
                }
                // Removal is host-acknowledged: the registry only changes on
                // PointRemoved.
                for id in model.selection.snapshot() {
                    if model.registry.contains(&id) {
                        caps.bridge.remove_point(id);
                    }
                }
            }
            Event::RemoveMarkerRequested { id } => {
                if model.bridge_ready {
                    caps.bridge.remove_point(id);
                } else {
                    Self::notice(model, caps, NOTICE_BRIDGE_UNAVAILABLE);
                }
            }

            Event::VisibilityToggled { id } => {
                if model.registry.toggle_visibility(&id).is_some() {
                    Self::invalidate(model, caps, ViewSlot::NavTree);
                    caps.render.render();
                }
            }
            Event::HideAll => Self::set_all_visibility(model, caps, false),
            Event::ShowAll => Self::set_all_visibility(model, caps, true),
            Event::HideSelected => Self::set_selected_visibility(model, caps, false),
            Event::ShowSelected => Self::set_selected_visibility(model, caps, true),
            Event::GroupVisibilityToggled { color } => {
                Self::toggle_group_visibility(model, caps, &ColorToken::new(color));
            }
            Event::GroupCollapseToggled { color } => {
                let color = ColorToken::new(color);
                if !model.views.collapsed_groups.remove(&color) {
                    model.views.collapsed_groups.insert(color);
                }
                Self::invalidate(model, caps, ViewSlot::NavTree);
            }

            Event::ColorPicked { color } => Self::pick_color(model, caps, color),
            Event::FlushTimerElapsed { generation } => Self::flush_colors(model, caps, generation),

            Event::SearchSubmitted { query } => Self::search(model, caps, query),

            Event::OpenFileRequested { file_name } => {
                if model.bridge_ready {
                    caps.bridge.open_file_in_word(file_name);
                } else {
                    Self::notice(model, caps, NOTICE_OPEN_FILE_UNAVAILABLE);
                }
            }
            Event::RevealFileRequested { file_name } => {
                if model.bridge_ready {
                    caps.bridge.open_file_location(file_name);
                } else {
                    Self::notice(model, caps, NOTICE_OPEN_LOCATION_UNAVAILABLE);
                }
            }

            Event::NetworkSignal { up, now_ms } => {
                model.connectivity.platform_online = up;
                if up {
                    Self::evaluate_connectivity(model, caps);
                } else {
                    // Down-signal short-circuits: conclude offline now and
                    // drop any probe still in flight.
                    model.connectivity.invalidate_probes();
                    Self::conclude_connectivity(model, caps, false, now_ms);
                }
            }
            Event::PollElapsed { .. } => {
                Self::evaluate_connectivity(model, caps);
                caps.timer.after(CONNECTIVITY_POLL_MS, |fired| Event::PollElapsed {
                    now_ms: fired.now_ms,
                });
            }
            Event::ProbeCompleted { generation, outcome, now_ms } => {
                if !model.connectivity.is_current_probe(generation) {
                    debug!("dropping superseded probe result");
                    return;
                }
                let online =
                    model.connectivity.platform_online && outcome == ProbeOutcome::Reachable;
                Self::conclude_connectivity(model, caps, online, now_ms);
            }

            Event::TileRequested { key } => Self::request_tile(model, caps, key),
            Event::TileFetched { key, epoch, result } => {
                Self::tile_fetched(model, caps, key, epoch, result);
            }
            Event::LayerRefreshed => {
                if model.tiles.mode() == Some(TileMode::Offline) {
                    let epoch = model.tiles.refresh();
                    debug!(epoch, "tile cache cleared on layer refresh");
                }
            }

            Event::FrameTick { slot } => Self::frame_tick(model, caps, slot),
            Event::NoticeDismissed => {
                model.notice = None;
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            markers: render::build_marker_views(&model.registry),
            nav_tree: model.views.nav_tree.clone(),
            selected: model.views.selected.clone(),
            detail: model
                .views
                .detail_id
                .as_ref()
                .and_then(|id| render::build_detail(&model.registry, id)),
            detail_placeholder: render::detail_placeholder(),
            search: model.views.search.clone(),
            status: render::status_view(&model.connectivity, model.tiles.mode()),
            notice: model.notice.clone(),
        }
    }
}

impl App {
    fn start(model: &mut Model, caps: &Capabilities, _now_ms: u64) {
        if model.initialized {
            caps.render.render();
            return;
        }
        model.initialized = true;
        Self::enter_offline(model, caps);
        Self::evaluate_connectivity(model, caps);
        caps.timer.after(CONNECTIVITY_POLL_MS, |fired| Event::PollElapsed {
            now_ms: fired.now_ms,
        });
    }

    fn ingest_initial(model: &mut Model, caps: &Capabilities, payloads: Vec<MarkerPayload>) {
        for payload in payloads {
            match payload.into_record() {
                Ok(record) => {
                    if model.registry.insert(record) {
                        warn!("initial marker replaced an existing id");
                    }
                }
                Err(e) => warn!("dropping malformed initial marker: {e}"),
            }
        }
        Self::invalidate(model, caps, ViewSlot::NavTree);
        Self::invalidate(model, caps, ViewSlot::SelectedList);
        caps.render.render();
    }

    fn add_marker(model: &mut Model, caps: &Capabilities, payload: MarkerPayload) {
        match payload.into_record() {
            Ok(record) => {
                if model.registry.insert(record) {
                    warn!("marker add replaced an existing id");
                }
                Self::invalidate(model, caps, ViewSlot::NavTree);
                caps.render.render();
            }
            Err(e) => warn!("dropping malformed marker payload: {e}"),
        }
    }

    fn update_marker(model: &mut Model, caps: &Capabilities, payload: MarkerPayload) {
        let id = payload.id.clone();
        match model.registry.update(payload) {
            UpdateOutcome::Applied { .. } => {
                // A selected marker's update pulls the detail panel to it.
                if model.selection.contains(&id) {
                    model.views.detail_id = Some(id);
                }
                Self::invalidate(model, caps, ViewSlot::NavTree);
                Self::invalidate(model, caps, ViewSlot::SelectedList);
                caps.render.render();
            }
            UpdateOutcome::Unknown => warn!("update for unknown marker id {id}"),
        }
    }

    fn remove_marker(model: &mut Model, caps: &Capabilities, id: &MarkerId) {
        if model.registry.remove(id).is_none() {
            debug!("remove for unknown marker id {id}");
            return;
        }
        model.selection.remove(id);
        if model.views.detail_id.as_ref() == Some(id) {
            model.views.detail_id = None;
        }
        Self::invalidate(model, caps, ViewSlot::NavTree);
        Self::invalidate(model, caps, ViewSlot::SelectedList);
        caps.render.render();
    }

    fn focus_and_toggle(model: &mut Model, caps: &Capabilities, id: &MarkerId, pan: bool) {
        let Some(record) = model.registry.get(id) else {
            debug!("interaction with unknown marker id {id}");
            return;
        };
        if pan {
            caps.map.focus_marker(record.id.clone(), record.lat, record.lng);
        }
        model.views.detail_id = Some(id.clone());
        model.selection.toggle(id);
        Self::invalidate(model, caps, ViewSlot::NavTree);
        Self::invalidate(model, caps, ViewSlot::SelectedList);
        caps.render.render();
    }

    fn set_all_visibility(model: &mut Model, caps: &Capabilities, visible: bool) {
        model.registry.set_all_visibility(visible);
        Self::invalidate(model, caps, ViewSlot::NavTree);
        caps.render.render();
    }

    fn set_selected_visibility(model: &mut Model, caps: &Capabilities, visible: bool) {
        for id in model.selection.snapshot() {
            model.registry.set_visibility(&id, visible);
        }
        Self::invalidate(model, caps, ViewSlot::NavTree);
        caps.render.render();
    }

    /// All members visible -> hide the group; otherwise show the group.
    fn toggle_group_visibility(model: &mut Model, caps: &Capabilities, color: &ColorToken) {
        let members: Vec<MarkerId> = model
            .registry
            .iter()
            .filter(|r| &r.color == color)
            .map(|r| r.id.clone())
            .collect();
        if members.is_empty() {
            return;
        }
        let all_visible = members
            .iter()
            .all(|id| model.registry.get(id).is_some_and(|r| r.visible));
        for id in &members {
            model.registry.set_visibility(id, !all_visible);
        }
        Self::invalidate(model, caps, ViewSlot::NavTree);
        caps.render.render();
    }

    fn pick_color(model: &mut Model, caps: &Capabilities, color: String) {
        if model.selection.is_empty() {
            Self::notice(model, caps, NOTICE_SELECT_FIRST);
            return;
        }
        let color = ColorToken::new(color);
        // Applied immediately for feedback; the host hears about it after
        // the quiet period.
        for id in model.selection.snapshot() {
            model.registry.set_color(&id, color.clone());
        }
        let generation = model.sync_queue.enqueue(color, model.selection.snapshot());
        caps.timer.after(COLOR_SYNC_QUIET_MS, move |_| Event::FlushTimerElapsed {
            generation,
        });
        Self::invalidate(model, caps, ViewSlot::NavTree);
        caps.render.render();
    }

    fn flush_colors(model: &mut Model, caps: &Capabilities, generation: u64) {
        if !model.sync_queue.is_current(generation) {
            // A later pick re-armed the quiet period; this timer is dead.
            return;
        }
        if model.sync_queue.is_empty() {
            return;
        }
        if !model.bridge_ready {
            warn!("dropping color batch: bridge not connected");
            model.sync_queue.clear();
            Self::notice(model, caps, NOTICE_SYNC_DROPPED);
            return;
        }

        let final_colors = model.sync_queue.collapse();
        let mut changed = false;
        for (id, color) in final_colors {
            changed |= model.registry.set_color(&id, color);
        }
        model.sync_queue.clear();

        match serde_json::to_string(&sync::snapshot(&model.registry)) {
            Ok(json) => caps.bridge.change_color(json),
            Err(e) => error!("color snapshot serialization failed: {e}"),
        }

        if changed {
            Self::invalidate(model, caps, ViewSlot::NavTree);
            caps.render.render();
        }
    }

    fn search(model: &mut Model, caps: &Capabilities, query: String) {
        let query = query.trim().to_owned();
        model.views.search_query.clone_from(&query);

        if query.is_empty() {
            model.views.search = render::SearchView::default();
            model.registry.set_all_visibility(true);
        } else {
            model.registry.set_all_visibility(false);
            let results = render::build_search_results(&model.registry, &query);
            for result in &results {
                model.registry.set_visibility(&result.id, true);
            }
            model.views.search = render::SearchView {
                visible: true,
                results,
            };
        }
        Self::invalidate(model, caps, ViewSlot::NavTree);
        caps.render.render();
    }

    fn evaluate_connectivity(model: &mut Model, caps: &Capabilities) {
        if !model.connectivity.platform_online {
            // Platform says down; no point probing.
            return;
        }
        let generation = model.connectivity.begin_probe();
        caps.probe.check(
            PROBE_URL.to_owned(),
            PROBE_TIMEOUT_MS,
            move |output| Event::ProbeCompleted {
                generation,
                outcome: output.outcome,
                now_ms: output.checked_at_ms,
            },
        );
    }

    fn conclude_connectivity(model: &mut Model, caps: &Capabilities, online: bool, now_ms: u64) {
        model.connectivity.conclude(online, now_ms);
        if online {
            Self::enter_online(model, caps);
        } else {
            Self::enter_offline(model, caps);
        }
    }

    fn enter_offline(model: &mut Model, caps: &Capabilities) {
        // Same mode in force: only the status line needs refreshing.
        if let Some(epoch) = model.tiles.activate(TileMode::Offline) {
            caps.map.switch_layer(TileMode::Offline, epoch);
            if model.bridge_ready {
                caps.bridge.switch_to_offline_mode();
            }
        }
        caps.render.render();
    }

    fn enter_online(model: &mut Model, caps: &Capabilities) {
        if let Some(epoch) = model.tiles.activate(TileMode::Online) {
            caps.map.switch_layer(TileMode::Online, epoch);
            if model.bridge_ready {
                caps.bridge.switch_to_online_mode();
            }
        }
        caps.render.render();
    }

    fn request_tile(model: &mut Model, caps: &Capabilities, key: TileKey) {
        if model.tiles.mode() != Some(TileMode::Offline) {
            // The online layer is the shell's own; nothing to do here.
            return;
        }
        let url = key.url();
        let epoch = model.tiles.epoch();

        if let Some(pixels) = model.tiles.cached(&url) {
            caps.map.draw_tile(key, epoch, TileImage::Decoded(pixels));
            return;
        }
        if !model.bridge_ready {
            caps.map.draw_tile(key, epoch, TileImage::OfflinePlaceholder);
            return;
        }
        if !model.tiles.begin_fetch(&url) {
            // A fetch for this URL is already in flight.
            return;
        }
        caps.bridge.get_tile(url, move |result| Event::TileFetched {
            key,
            epoch,
            result,
        });
    }

    fn tile_fetched(
        model: &mut Model,
        caps: &Capabilities,
        key: TileKey,
        epoch: u64,
        result: BridgeResult,
    ) {
        let url = key.url();
        model.tiles.finish_fetch(&url);

        let image = match result {
            Ok(BridgeOutput::Tile(bytes)) => match tiles::decode_tile(&bytes) {
                Ok(pixels) => {
                    model.tiles.store(url, epoch, pixels.clone());
                    TileImage::Decoded(pixels)
                }
                Err(e) => {
                    debug!("tile {key:?} fell back to placeholder: {e}");
                    TileImage::OfflinePlaceholder
                }
            },
            Ok(BridgeOutput::Ack) => {
                warn!("unexpected ack for a tile fetch");
                TileImage::OfflinePlaceholder
            }
            Err(e) => {
                warn!("tile fetch failed: {e}");
                TileImage::OfflinePlaceholder
            }
        };
        caps.map.draw_tile(key, model.tiles.epoch(), image);
    }

    fn frame_tick(model: &mut Model, caps: &Capabilities, slot: ViewSlot) {
        match slot {
            ViewSlot::NavTree => {
                model.views.tree_scheduled = false;
                if !model.views.tree_dirty {
                    return;
                }
                model.views.tree_dirty = false;
                model.views.prune_collapsed(&model.registry);
                model.views.nav_tree = render::build_nav_tree(
                    &model.registry,
                    &model.selection,
                    &model.views.collapsed_groups,
                );
            }
            ViewSlot::SelectedList => {
                model.views.list_scheduled = false;
                if !model.views.list_dirty {
                    return;
                }
                model.views.list_dirty = false;
                model.views.selected =
                    render::build_selected_list(&model.registry, &model.selection);
            }
        }
        caps.render.render();
    }

    /// Marks a view dirty and schedules a frame unless one is pending.
    fn invalidate(model: &mut Model, caps: &Capabilities, slot: ViewSlot) {
        let scheduled = match slot {
            ViewSlot::NavTree => {
                model.views.tree_dirty = true;
                &mut model.views.tree_scheduled
            }
            ViewSlot::SelectedList => {
                model.views.list_dirty = true;
                &mut model.views.list_scheduled
            }
        };
        if *scheduled {
            return;
        }
        *scheduled = true;
        caps.frame.request(move |_| Event::FrameTick { slot });
    }

    fn notice(model: &mut Model, caps: &Capabilities, text: &str) {
        model.notice = Some(text.to_owned());
        caps.render.render();
    }
}
