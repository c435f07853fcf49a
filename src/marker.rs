//! Marker payloads, records and the registry.
//!
//! Payloads are the wire shape the host sends; records are the normalized
//! form the rest of the engine works with. Normalization happens exactly
//! once, at ingestion.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::DEFAULT_MARKER_COLOR;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("marker id is empty")]
    EmptyId,
}

/// Opaque marker identifier.
///
/// Hosts have produced both string and numeric ids over the years, so this
/// deserializes from either and normalizes to a string once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerId(String);

impl MarkerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl<'de> Deserialize<'de> for MarkerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = MarkerId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or numeric marker id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MarkerId, E> {
                Ok(MarkerId(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<MarkerId, E> {
                Ok(MarkerId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MarkerId, E> {
                Ok(MarkerId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MarkerId, E> {
                Ok(MarkerId(v.to_string()))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MarkerId, E> {
                // Integral floats print without the trailing ".0" so that
                // id 42 and id 42.0 name the same marker.
                if v.fract() == 0.0 && v.is_finite() {
                    Ok(MarkerId((v as i64).to_string()))
                } else {
                    Ok(MarkerId(v.to_string()))
                }
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// CSS color string attached to a marker group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorToken(String);

impl ColorToken {
    #[must_use]
    pub fn new(color: impl Into<String>) -> Self {
        let color = color.into();
        if color.is_empty() {
            Self::default()
        } else {
            Self(color)
        }
    }

    /// Collapses a missing or empty color to the default.
    #[must_use]
    pub fn normalize(color: Option<String>) -> Self {
        match color {
            Some(c) if !c.is_empty() => Self(c),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ColorToken {
    fn default() -> Self {
        Self(DEFAULT_MARKER_COLOR.to_owned())
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker as the host sends it.
///
/// `deep`, `filters`, `debit` and `comments` are opaque to the engine and
/// only ever rendered as display text, so they stay as raw JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPayload {
    pub id: MarkerId,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deep: Value,
    #[serde(default)]
    pub filters: Value,
    #[serde(default)]
    pub debit: Value,
    #[serde(default)]
    pub comments: Value,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, rename = "fileNames")]
    pub file_names: Option<Vec<String>>,
}

impl MarkerPayload {
    /// Folds the legacy singular `fileName` and the `fileNames` array into
    /// one list. A non-empty array wins; otherwise the singular is promoted.
    #[must_use]
    pub fn folded_file_names(file_names: Option<Vec<String>>, file_name: Option<String>) -> Vec<String> {
        match file_names {
            Some(names) if !names.is_empty() => names,
            _ => file_name
                .filter(|n| !n.is_empty())
                .map(|n| vec![n])
                .unwrap_or_default(),
        }
    }

    pub fn into_record(self) -> Result<MarkerRecord, PayloadError> {
        if self.id.as_str().is_empty() {
            return Err(PayloadError::EmptyId);
        }
        let file_names = Self::folded_file_names(self.file_names, self.file_name);
        Ok(MarkerRecord {
            id: self.id,
            lat: self.lat.unwrap_or_default(),
            lng: self.lng.unwrap_or_default(),
            name: self.name,
            deep: self.deep,
            filters: self.filters,
            debit: self.debit,
            comments: self.comments,
            color: ColorToken::normalize(self.color),
            file_names,
            visible: true,
            icon_revision: 0,
        })
    }
}

/// Normalized marker state owned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub deep: Value,
    pub filters: Value,
    pub debit: Value,
    pub comments: Value,
    pub color: ColorToken,
    pub file_names: Vec<String>,
    pub visible: bool,
    /// Bumped whenever the color changes; the shell recreates the marker
    /// icon only when this moves.
    pub icon_revision: u32,
}

impl MarkerRecord {
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.file_names.len()
    }

    /// Replaces the color, bumping the icon revision only on an actual change.
    pub fn set_color(&mut self, color: ColorToken) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        self.icon_revision = self.icon_revision.wrapping_add(1);
        true
    }

    /// In-place update from a fresh payload. Coordinates only move when the
    /// payload carries them; visibility and selection are untouched.
    fn apply(&mut self, payload: MarkerPayload) -> bool {
        if let Some(lat) = payload.lat {
            self.lat = lat;
        }
        if let Some(lng) = payload.lng {
            self.lng = lng;
        }
        self.name = payload.name;
        self.deep = payload.deep;
        self.filters = payload.filters;
        self.debit = payload.debit;
        self.comments = payload.comments;
        self.file_names = MarkerPayload::folded_file_names(payload.file_names, payload.file_name);
        self.set_color(ColorToken::normalize(payload.color))
    }
}

/// Outcome of an in-place update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { color_changed: bool },
    Unknown,
}

/// All markers currently known to the engine, in host insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerRegistry {
    records: HashMap<MarkerId, MarkerRecord>,
    order: Vec<MarkerId>,
}

impl MarkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &MarkerId) -> bool {
        self.records.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &MarkerId) -> Option<&MarkerRecord> {
        self.records.get(id)
    }

    /// Inserts a record, replacing any record with the same id in place.
    /// Returns true when an existing record was replaced.
    pub fn insert(&mut self, record: MarkerRecord) -> bool {
        let id = record.id.clone();
        let replaced = self.records.insert(id.clone(), record).is_some();
        if !replaced {
            self.order.push(id);
        }
        replaced
    }

    pub fn update(&mut self, payload: MarkerPayload) -> UpdateOutcome {
        match self.records.get_mut(&payload.id) {
            Some(record) => {
                let color_changed = record.apply(payload);
                UpdateOutcome::Applied { color_changed }
            }
            None => UpdateOutcome::Unknown,
        }
    }

    pub fn remove(&mut self, id: &MarkerId) -> Option<MarkerRecord> {
        let removed = self.records.remove(id)?;
        self.order.retain(|o| o != id);
        Some(removed)
    }

    pub fn set_color(&mut self, id: &MarkerId, color: ColorToken) -> bool {
        self.records
            .get_mut(id)
            .is_some_and(|r| r.set_color(color))
    }

    pub fn set_visibility(&mut self, id: &MarkerId, visible: bool) -> bool {
        match self.records.get_mut(id) {
            Some(record) if record.visible != visible => {
                record.visible = visible;
                true
            }
            _ => false,
        }
    }

    /// Flips one marker's visibility; returns the new state if the id exists.
    pub fn toggle_visibility(&mut self, id: &MarkerId) -> Option<bool> {
        let record = self.records.get_mut(id)?;
        record.visible = !record.visible;
        Some(record.visible)
    }

    pub fn set_all_visibility(&mut self, visible: bool) {
        for record in self.records.values_mut() {
            record.visible = visible;
        }
    }

    /// Iterates records in host insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<MarkerId> {
        self.order.clone()
    }
}
