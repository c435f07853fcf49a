// lib.rs - wellmap-core: headless map-view engine

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod connectivity;
pub mod event;
pub mod marker;
pub mod model;
pub mod render;
pub mod selection;
pub mod sync;
pub mod tiles;

use std::num::NonZeroUsize;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::Model;
pub use render::ViewModel;

/// Color applied to markers whose payload carries no color (or an empty one).
pub const DEFAULT_MARKER_COLOR: &str = "#4361ee";

/// Quiet period between the last color pick and the batched host sync.
pub const COLOR_SYNC_QUIET_MS: u64 = 1_000;

/// Connectivity re-evaluation interval.
pub const CONNECTIVITY_POLL_MS: u64 = 15_000;

/// Shell-enforced abort deadline for a single reachability probe.
pub const PROBE_TIMEOUT_MS: u64 = 4_000;

/// Lightweight reachability target: one fixed tile on the online tile server.
pub const PROBE_URL: &str = "https://a.basemaps.cartocdn.com/rastertiles/voyager/0/0/0.png";

/// CartoDB Voyager raster tiles, as used by the online layer.
pub const ONLINE_TILE_TEMPLATE: &str =
    "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png";

pub const TILE_SUBDOMAINS: &str = "abcd";
pub const TILE_SIZE: u32 = 256;
pub const TILE_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(n) => n,
    None => unreachable!(),
};

pub const INITIAL_CENTER: (f64, f64) = (59.93, 30.34);
pub const INITIAL_ZOOM: u8 = 12;
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

// User-visible strings (the host UI is Russian).
pub const STATUS_ONLINE: &str = "● CartoDB Voyager - Онлайн режим";
pub const STATUS_OFFLINE_PREFIX: &str = "○ CartoDB Voyager - Офлайн режим";
pub const REASON_CHECKING: &str = "Проверка соединения...";
pub const REASON_FORCED: &str = "Принудительно выбран офлайн режим";
pub const REASON_NO_CONNECTION: &str = "Нет подключения к интернету";
pub const DETAIL_PLACEHOLDER: &str = "Выберите точку на карте или в списке";
pub const SELECTED_LIST_EMPTY: &str = "Нет выбранных точек";
pub const NOTICE_SELECT_FIRST: &str =
    "Сначала выберите маркеры, нажав на них в списке или на карте";
pub const NOTICE_BRIDGE_UNAVAILABLE: &str = "Нет связи с приложением. Действие не выполнено.";
pub const NOTICE_SYNC_DROPPED: &str = "Изменения цвета не отправлены: нет связи с приложением.";
pub const NOTICE_OPEN_FILE_UNAVAILABLE: &str = "Не удалось открыть файл. Функция недоступна.";
pub const NOTICE_OPEN_LOCATION_UNAVAILABLE: &str =
    "Не удалось открыть расположение файла. Функция недоступна.";
