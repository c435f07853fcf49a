//! View snapshots and their builders.
//!
//! The navigation tree and the selected-points list are rebuilt at most once
//! per animation frame: mutations mark them dirty, the frame handler rebuilds
//! from the registry. Everything else in the `ViewModel` is assembled on
//! demand in `view`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connectivity::{ConnectivityState, OfflineReason};
use crate::marker::{ColorToken, MarkerId, MarkerRecord, MarkerRegistry};
use crate::selection::SelectionState;
use crate::tiles::TileMode;
use crate::{
    DETAIL_PLACEHOLDER, REASON_CHECKING, REASON_FORCED, REASON_NO_CONNECTION, SELECTED_LIST_EMPTY,
    STATUS_OFFLINE_PREFIX, STATUS_ONLINE,
};

/// Views that rebuild on the frame schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewSlot {
    NavTree,
    SelectedList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub tree_dirty: bool,
    pub tree_scheduled: bool,
    pub list_dirty: bool,
    pub list_scheduled: bool,
    pub nav_tree: NavTreeView,
    pub selected: SelectedListView,
    /// Collapse state survives rebuilds, keyed by color token.
    pub collapsed_groups: HashSet<ColorToken>,
    pub detail_id: Option<MarkerId>,
    pub search_query: String,
    pub search: SearchView,
}

impl ViewState {
    /// Drops collapse state for colors no longer present in the registry.
    pub fn prune_collapsed(&mut self, registry: &MarkerRegistry) {
        let live: HashSet<&ColorToken> = registry.iter().map(|r| &r.color).collect();
        self.collapsed_groups.retain(|c| live.contains(c));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavTreeView {
    pub groups: Vec<ColorGroupView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorGroupView {
    pub color: ColorToken,
    pub marker_count: usize,
    pub file_count: usize,
    pub all_visible: bool,
    pub collapsed: bool,
    pub entries: Vec<TreeEntryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntryView {
    pub id: MarkerId,
    pub name: String,
    pub file_count: usize,
    pub selected: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedListView {
    pub entries: Vec<SelectedEntryView>,
    pub empty_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntryView {
    pub id: MarkerId,
    pub name: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchView {
    pub visible: bool,
    pub results: Vec<SearchResultView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultView {
    pub id: MarkerId,
    pub name: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetailView {
    pub id: MarkerId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub deep: String,
    pub filters: String,
    pub debit: String,
    pub comments: String,
    pub color: ColorToken,
    pub files: Vec<String>,
}

/// One marker on the map layer. `icon_revision` tells the shell when to
/// recreate the icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerView {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    pub color: ColorToken,
    pub visible: bool,
    pub icon_revision: u32,
    pub popup_html: String,
    pub tooltip_html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub online: bool,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub markers: Vec<MarkerView>,
    pub nav_tree: NavTreeView,
    pub selected: SelectedListView,
    pub detail: Option<MarkerDetailView>,
    pub detail_placeholder: String,
    pub search: SearchView,
    pub status: StatusView,
    pub notice: Option<String>,
}

/// Minimal HTML escaping for host-provided text interpolated into markup.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Display text for an opaque attribute value.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[must_use]
pub fn popup_html(record: &MarkerRecord) -> String {
    format!(
        "<strong>{}</strong><br>Файлов: {}",
        escape_html(&record.name),
        record.file_count()
    )
}

#[must_use]
pub fn tooltip_html(record: &MarkerRecord) -> String {
    format!(
        "{}<br>Глубина: {}",
        escape_html(&record.name),
        escape_html(&value_text(&record.deep))
    )
}

#[must_use]
pub fn build_marker_views(registry: &MarkerRegistry) -> Vec<MarkerView> {
    registry
        .iter()
        .map(|record| MarkerView {
            id: record.id.clone(),
            lat: record.lat,
            lng: record.lng,
            color: record.color.clone(),
            visible: record.visible,
            icon_revision: record.icon_revision,
            popup_html: popup_html(record),
            tooltip_html: tooltip_html(record),
        })
        .collect()
}

/// Groups markers by color in first-seen order.
#[must_use]
pub fn build_nav_tree(
    registry: &MarkerRegistry,
    selection: &SelectionState,
    collapsed: &HashSet<ColorToken>,
) -> NavTreeView {
    let mut groups: Vec<ColorGroupView> = Vec::new();
    for record in registry.iter() {
        let entry = TreeEntryView {
            id: record.id.clone(),
            name: record.name.clone(),
            file_count: record.file_count(),
            selected: selection.contains(&record.id),
            visible: record.visible,
        };
        match groups.iter_mut().find(|g| g.color == record.color) {
            Some(group) => {
                group.marker_count += 1;
                group.file_count += record.file_count();
                group.all_visible &= record.visible;
                group.entries.push(entry);
            }
            None => groups.push(ColorGroupView {
                color: record.color.clone(),
                marker_count: 1,
                file_count: record.file_count(),
                all_visible: record.visible,
                collapsed: collapsed.contains(&record.color),
                entries: vec![entry],
            }),
        }
    }
    NavTreeView { groups }
}

#[must_use]
pub fn build_selected_list(registry: &MarkerRegistry, selection: &SelectionState) -> SelectedListView {
    let entries: Vec<SelectedEntryView> = selection
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|record| SelectedEntryView {
            id: record.id.clone(),
            name: record.name.clone(),
            file_count: record.file_count(),
        })
        .collect();
    let empty_text = entries.is_empty().then(|| SELECTED_LIST_EMPTY.to_owned());
    SelectedListView { entries, empty_text }
}

/// Case-insensitive substring match on the marker name.
#[must_use]
pub fn build_search_results(registry: &MarkerRegistry, query: &str) -> Vec<SearchResultView> {
    let needle = query.to_lowercase();
    registry
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .map(|record| SearchResultView {
            id: record.id.clone(),
            name: record.name.clone(),
            file_count: record.file_count(),
        })
        .collect()
}

#[must_use]
pub fn build_detail(registry: &MarkerRegistry, id: &MarkerId) -> Option<MarkerDetailView> {
    let record = registry.get(id)?;
    Some(MarkerDetailView {
        id: record.id.clone(),
        name: record.name.clone(),
        lat: record.lat,
        lng: record.lng,
        deep: value_text(&record.deep),
        filters: value_text(&record.filters),
        debit: value_text(&record.debit),
        comments: value_text(&record.comments),
        color: record.color.clone(),
        files: record.file_names.clone(),
    })
}

#[must_use]
pub fn status_view(connectivity: &ConnectivityState, mode: Option<TileMode>) -> StatusView {
    if mode == Some(TileMode::Online) {
        return StatusView {
            online: true,
            text: STATUS_ONLINE.to_owned(),
        };
    }
    let reason = match connectivity.offline_reason() {
        OfflineReason::Checking => REASON_CHECKING,
        OfflineReason::Forced => REASON_FORCED,
        OfflineReason::NoConnection => REASON_NO_CONNECTION,
    };
    StatusView {
        online: false,
        text: format!("{STATUS_OFFLINE_PREFIX} ({reason})"),
    }
}

#[must_use]
pub fn detail_placeholder() -> String {
    DETAIL_PLACEHOLDER.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerPayload;

    fn insert(registry: &mut MarkerRegistry, id: &str, name: &str, color: &str, files: usize) {
        let payload = MarkerPayload {
            id: MarkerId::from(id),
            lat: Some(59.9),
            lng: Some(30.3),
            name: name.into(),
            deep: Value::String("150".into()),
            filters: Value::Null,
            debit: Value::Null,
            comments: Value::Null,
            color: Some(color.into()),
            file_name: None,
            file_names: Some((0..files).map(|i| format!("f{i}.docx")).collect()),
        };
        registry.insert(payload.into_record().unwrap());
    }

    #[test]
    fn groups_form_in_first_seen_color_order() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "w-1", "#222222", 1);
        insert(&mut registry, "2", "w-2", "#111111", 2);
        insert(&mut registry, "3", "w-3", "#222222", 0);

        let tree = build_nav_tree(&registry, &SelectionState::new(), &HashSet::new());
        assert_eq!(tree.groups.len(), 2);
        assert_eq!(tree.groups[0].color.as_str(), "#222222");
        assert_eq!(tree.groups[0].marker_count, 2);
        assert_eq!(tree.groups[0].file_count, 1);
        assert_eq!(tree.groups[1].color.as_str(), "#111111");
    }

    #[test]
    fn group_visibility_is_all_members_visible() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "w-1", "#222222", 0);
        insert(&mut registry, "2", "w-2", "#222222", 0);
        registry.set_visibility(&MarkerId::from("2"), false);

        let tree = build_nav_tree(&registry, &SelectionState::new(), &HashSet::new());
        assert!(!tree.groups[0].all_visible);
        assert!(tree.groups[0].entries[0].visible);
        assert!(!tree.groups[0].entries[1].visible);
    }

    #[test]
    fn selected_list_keeps_selection_order_and_empty_text() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "w-1", "#222222", 0);
        insert(&mut registry, "2", "w-2", "#222222", 0);

        let mut selection = SelectionState::new();
        selection.toggle(&MarkerId::from("2"));
        selection.toggle(&MarkerId::from("1"));

        let list = build_selected_list(&registry, &selection);
        let names: Vec<&str> = list.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w-2", "w-1"]);
        assert_eq!(list.empty_text, None);

        let empty = build_selected_list(&registry, &SelectionState::new());
        assert_eq!(empty.empty_text.as_deref(), Some(SELECTED_LIST_EMPTY));
    }

    #[test]
    fn search_is_case_insensitive_substring_on_name() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "Скважина-1", "#222222", 0);
        insert(&mut registry, "2", "Опора", "#222222", 0);

        let results = build_search_results(&registry, "скважина");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Скважина-1");
    }

    #[test]
    fn markup_escapes_host_text() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "<img src=x>", "#222222", 0);
        let record = registry.get(&MarkerId::from("1")).unwrap();
        assert_eq!(
            popup_html(record),
            "<strong>&lt;img src=x&gt;</strong><br>Файлов: 0"
        );
        assert!(tooltip_html(record).starts_with("&lt;img src=x&gt;"));
    }

    #[test]
    fn collapse_state_prunes_with_registry() {
        let mut registry = MarkerRegistry::new();
        insert(&mut registry, "1", "w-1", "#222222", 0);

        let mut views = ViewState::default();
        views.collapsed_groups.insert(ColorToken::new("#222222"));
        views.collapsed_groups.insert(ColorToken::new("#dead00"));
        views.prune_collapsed(&registry);
        assert!(views.collapsed_groups.contains(&ColorToken::new("#222222")));
        assert_eq!(views.collapsed_groups.len(), 1);
    }

    #[test]
    fn status_text_reflects_mode_and_reason() {
        let mut connectivity = ConnectivityState::new();
        assert_eq!(
            status_view(&connectivity, Some(TileMode::Offline)).text,
            format!("{STATUS_OFFLINE_PREFIX} ({REASON_CHECKING})")
        );
        connectivity.conclude(true, 1);
        assert_eq!(
            status_view(&connectivity, Some(TileMode::Offline)).text,
            format!("{STATUS_OFFLINE_PREFIX} ({REASON_FORCED})")
        );
        assert_eq!(
            status_view(&connectivity, Some(TileMode::Online)).text,
            STATUS_ONLINE
        );
    }
}
