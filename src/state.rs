//! Map state and its transitions. The marker collection, the focus, and the
//! pending marker name live here as one owned object; every mutation writes
//! the full collection back through the storage port before returning, and
//! the view layers only ever see immutable snapshots.

use crate::geoloc::LocationSource;
use crate::locations::{DEFAULT_LOCATION, PREDEFINED};
use crate::store::MarkerStore;
use crate::types::{Focus, GeoPoint, Marker, PinKind};
use anyhow::Result;
use chrono::Local;
use serde::Serialize;

/// Immutable view of the state after a transition. The view layer redraws
/// from this; it never reaches into `MapState`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub focus: Focus,
    pub markers: Vec<Marker>,
    pub custom_count: usize,
    pub total_count: usize,
}

/// One renderable pin, custom or shipped.
#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub name: String,
    pub position: GeoPoint,
    pub kind: PinKind,
}

impl Snapshot {
    /// Everything the map view draws: the default location, the predefined
    /// shops, then the custom markers in creation order.
    pub fn pins(&self) -> Vec<Pin> {
        let mut pins = Vec::with_capacity(self.markers.len() + PREDEFINED.len() + 1);
        pins.push(Pin {
            name: DEFAULT_LOCATION.name.to_string(),
            position: DEFAULT_LOCATION.position(),
            kind: PinKind::Default,
        });
        for loc in &PREDEFINED {
            pins.push(Pin {
                name: loc.name.to_string(),
                position: loc.position(),
                kind: PinKind::Predefined,
            });
        }
        for marker in &self.markers {
            pins.push(Pin {
                name: marker.name.clone(),
                position: marker.position,
                kind: PinKind::Custom,
            });
        }
        pins
    }
}

/// A transition result: the fresh snapshot, plus a user-visible notice when
/// the transition was refused (geolocation failure, marker cap).
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub snapshot: Snapshot,
    pub notice: Option<String>,
}

pub struct MapState<S: MarkerStore> {
    store: S,
    markers: Vec<Marker>,
    focus: Focus,
    pending_name: String,
    last_id: u64,
    max_markers: usize,
}

impl<S: MarkerStore> MapState<S> {
    /// Initialize from the store; a missing or corrupt payload starts empty.
    /// Focus opens on the default location.
    pub fn init(store: S, max_markers: usize) -> Self {
        let markers = store.load();
        tracing::info!("Loaded {} saved markers", markers.len());
        let last_id = markers.iter().map(|m| m.id).max().unwrap_or(0);
        MapState {
            store,
            markers,
            focus: DEFAULT_LOCATION.focus(),
            pending_name: String::new(),
            last_id,
            max_markers,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            focus: self.focus.clone(),
            markers: self.markers.clone(),
            custom_count: self.markers.len(),
            // Shipped pins: the default location plus the predefined shops.
            total_count: self.markers.len() + PREDEFINED.len() + 1,
        }
    }

    fn ok(&self) -> Outcome {
        Outcome {
            snapshot: self.snapshot(),
            notice: None,
        }
    }

    fn refused(&self, notice: String) -> Outcome {
        Outcome {
            snapshot: self.snapshot(),
            notice: Some(notice),
        }
    }

    /// Ids are creation timestamps in milliseconds, forced strictly
    /// increasing within a session so rapid clicks stay ordered.
    fn next_id(&mut self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Consume the pending name, or fall back to the given default.
    fn take_name(&mut self, fallback: String) -> String {
        let name = std::mem::take(&mut self.pending_name);
        if name.is_empty() {
            fallback
        } else {
            name
        }
    }

    fn create_marker(&mut self, position: GeoPoint, name: String) -> Result<Outcome> {
        let marker = Marker {
            id: self.next_id(),
            position,
            name,
        };
        self.focus = Focus::from(&marker);
        self.markers.push(marker);
        self.store.save(&self.markers)?;
        Ok(self.ok())
    }

    /// The free-text name field; used for the next creation if non-empty.
    pub fn set_pending_name(&mut self, name: String) {
        self.pending_name = name;
    }

    /// A click on the map surface: create a marker there and focus it.
    pub fn click(&mut self, position: GeoPoint) -> Result<Outcome> {
        if self.markers.len() >= self.max_markers {
            return Ok(self.refused(format!(
                "Marker limit of {} reached. Clear markers to add more.",
                self.max_markers
            )));
        }
        let name = self.take_name(format!("Marker {}", self.markers.len() + 1));
        self.create_marker(position, name)
    }

    /// "Add My Location Marker": ask the device, create a marker on success,
    /// surface a notice and change nothing on failure.
    pub fn locate(&mut self, source: &dyn LocationSource) -> Result<Outcome> {
        if self.markers.len() >= self.max_markers {
            return Ok(self.refused(format!(
                "Marker limit of {} reached. Clear markers to add more.",
                self.max_markers
            )));
        }
        match source.current() {
            Ok(position) => {
                let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                let name = self.take_name(format!("Current location ({})", stamp));
                self.create_marker(position, name)
            }
            Err(e) => {
                tracing::warn!("Geolocation failed: {}", e);
                Ok(self.refused(e.to_string()))
            }
        }
    }

    /// Focus a predefined location or an existing marker by name. Markers
    /// share no uniqueness constraint; the first match wins.
    pub fn select(&mut self, name: &str) -> Option<Snapshot> {
        if let Some(loc) = crate::locations::find(name) {
            self.focus = loc.focus();
            return Some(self.snapshot());
        }
        if let Some(marker) = self.markers.iter().find(|m| m.name == name) {
            self.focus = Focus::from(marker);
            return Some(self.snapshot());
        }
        None
    }

    /// Focus a specific marker by id.
    pub fn select_marker(&mut self, id: u64) -> Option<Snapshot> {
        let marker = self.markers.iter().find(|m| m.id == id)?;
        self.focus = Focus::from(marker);
        Some(self.snapshot())
    }

    /// Drop all custom markers. Focus stays where it was.
    pub fn clear(&mut self) -> Result<Outcome> {
        self.markers.clear();
        self.store.save(&self.markers)?;
        Ok(self.ok())
    }
}
