//! Persistence: a cookie-jar style key-value store, and the marker store
//! port layered on top of it.

use crate::types::Marker;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// The key the marker collection persists under.
pub const MARKER_COOKIE: &str = "customMarkers";

#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

impl CookieOptions {
    /// The options every marker write uses: path `/`, no explicit expiry.
    pub fn root() -> Self {
        CookieOptions {
            path: "/".to_string(),
            expires: None,
        }
    }
}

/// Get/set string values in a persistent jar. Overlong values are not
/// policed here; callers bound their own payloads.
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CookieEntry {
    value: String,
    path: String,
    expires: Option<DateTime<Utc>>,
}

/// File-backed jar: one cookie per line, `name=value; Path=...; Expires=...`,
/// values percent-free (tab/newline stripped on write). The whole file is
/// rewritten on every set, matching write-after-mutation persistence.
pub struct CookieFile {
    path: PathBuf,
    entries: BTreeMap<String, CookieEntry>,
}

impl CookieFile {
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut entries = BTreeMap::new();
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read cookie file: {:?}", path))?;
            for line in content.lines() {
                if let Some(entry) = parse_line(line) {
                    entries.insert(entry.0, entry.1);
                }
            }
        }
        Ok(CookieFile { path, entries })
    }

    fn flush(&self) -> Result<()> {
        let mut out = String::new();
        for (name, entry) in &self.entries {
            out.push_str(name);
            out.push('=');
            out.push_str(&escape_value(&entry.value));
            out.push_str("; Path=");
            out.push_str(&entry.path);
            if let Some(expires) = entry.expires {
                out.push_str("; Expires=");
                out.push_str(&expires.to_rfc3339());
            }
            out.push('\n');
        }
        fs::write(&self.path, out)
            .with_context(|| format!("Failed to write cookie file: {:?}", self.path))
    }
}

// Values are percent-escaped on write so a `;` in user text can't split the
// line into bogus attributes.
fn escape_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(';', "%3B")
        .replace('\n', "%0A")
        .replace('\t', "%09")
}

fn unescape_value(value: &str) -> String {
    value
        .replace("%09", "\t")
        .replace("%0A", "\n")
        .replace("%3B", ";")
        .replace("%25", "%")
}

fn parse_line(line: &str) -> Option<(String, CookieEntry)> {
    let mut parts = line.split("; ");
    let pair = parts.next()?;
    let (name, value) = pair.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    let value = unescape_value(value);
    let mut path = "/".to_string();
    let mut expires = None;
    for attr in parts {
        if let Some(p) = attr.strip_prefix("Path=") {
            path = p.to_string();
        } else if let Some(e) = attr.strip_prefix("Expires=") {
            expires = DateTime::parse_from_rfc3339(e)
                .ok()
                .map(|d| d.with_timezone(&Utc));
        }
    }
    Some((
        name.to_string(),
        CookieEntry {
            value,
            path,
            expires,
        },
    ))
}

impl CookieStore for CookieFile {
    fn get(&self, name: &str) -> Option<String> {
        let entry = self.entries.get(name)?;
        if let Some(expires) = entry.expires {
            if expires < Utc::now() {
                return None;
            }
        }
        Some(entry.value.clone())
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        self.entries.insert(
            name.to_string(),
            CookieEntry {
                value: value.to_string(),
                path: options.path.clone(),
                expires: options.expires,
            },
        );
        self.flush()
    }
}

impl<C: CookieStore + ?Sized> CookieStore for &mut C {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        (**self).set(name, value, options)
    }
}

/// In-memory jar for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCookies {
    entries: BTreeMap<String, String>,
}

impl CookieStore for MemoryCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.entries.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str, _options: &CookieOptions) -> Result<()> {
        self.entries.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage port for the marker collection. Swappable so state transitions
/// can be exercised without touching the filesystem.
pub trait MarkerStore {
    /// Decode the stored collection. Absent or unparsable values yield an
    /// empty vec; this never errors.
    fn load(&self) -> Vec<Marker>;
    /// Encode and write the full collection.
    fn save(&mut self, markers: &[Marker]) -> Result<()>;
}

/// Markers persisted as a JSON array under the `customMarkers` cookie.
pub struct CookieMarkerStore<C: CookieStore> {
    jar: C,
}

impl<C: CookieStore> CookieMarkerStore<C> {
    pub fn new(jar: C) -> Self {
        CookieMarkerStore { jar }
    }
}

impl<C: CookieStore> MarkerStore for CookieMarkerStore<C> {
    fn load(&self) -> Vec<Marker> {
        let Some(raw) = self.jar.get(MARKER_COOKIE) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(markers) => markers,
            Err(e) => {
                tracing::warn!("Discarding unparsable marker cookie: {}", e);
                Vec::new()
            }
        }
    }

    fn save(&mut self, markers: &[Marker]) -> Result<()> {
        let encoded = serde_json::to_string(markers).context("Failed to encode markers")?;
        self.jar
            .set(MARKER_COOKIE, &encoded, &CookieOptions::root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;
    use chrono::Duration;

    fn marker(id: u64, lat: f64, lng: f64, name: &str) -> Marker {
        Marker {
            id,
            position: GeoPoint::new(lat, lng).unwrap(),
            name: name.to_string(),
        }
    }

    #[test]
    fn cookie_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");

        let mut jar = CookieFile::open(path.clone()).unwrap();
        jar.set("customMarkers", "[1,2,3]", &CookieOptions::root())
            .unwrap();
        jar.set("other", "x", &CookieOptions::root()).unwrap();

        let reopened = CookieFile::open(path).unwrap();
        assert_eq!(reopened.get("customMarkers").as_deref(), Some("[1,2,3]"));
        assert_eq!(reopened.get("other").as_deref(), Some("x"));
        assert_eq!(reopened.get("missing"), None);
    }

    #[test]
    fn semicolons_in_values_survive_the_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        {
            let mut jar = CookieFile::open(path.clone()).unwrap();
            jar.set("note", "a; Path=/evil; 100%", &CookieOptions::root())
                .unwrap();
        }
        let jar = CookieFile::open(path).unwrap();
        assert_eq!(jar.get("note").as_deref(), Some("a; Path=/evil; 100%"));
    }

    #[test]
    fn expired_cookies_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut jar = CookieFile::open(dir.path().join("cookies.txt")).unwrap();
        let opts = CookieOptions {
            path: "/".to_string(),
            expires: Some(Utc::now() - Duration::hours(1)),
        };
        jar.set("stale", "gone", &opts).unwrap();
        assert_eq!(jar.get("stale"), None);
    }

    #[test]
    fn marker_store_round_trips_order_names_positions() {
        let mut store = CookieMarkerStore::new(MemoryCookies::default());
        let markers = vec![
            marker(1, 22.41, 114.20, "Marker 1"),
            marker(2, 22.42, 114.21, "lunch spot"),
            marker(3, 22.42, 114.21, "lunch spot"),
        ];
        store.save(&markers).unwrap();
        assert_eq!(store.load(), markers);
    }

    #[test]
    fn absent_cookie_loads_empty() {
        let store = CookieMarkerStore::new(MemoryCookies::default());
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupted_cookie_loads_empty() {
        let mut jar = MemoryCookies::default();
        jar.set(MARKER_COOKIE, "not json {", &CookieOptions::root())
            .unwrap();
        let store = CookieMarkerStore::new(jar);
        assert!(store.load().is_empty());
    }

    #[test]
    fn out_of_range_position_discards_whole_payload() {
        let mut jar = MemoryCookies::default();
        jar.set(
            MARKER_COOKIE,
            r#"[{"id":1,"position":[999.0,0.0],"name":"bad"}]"#,
            &CookieOptions::root(),
        )
        .unwrap();
        let store = CookieMarkerStore::new(jar);
        assert!(store.load().is_empty());
    }

    #[test]
    fn saved_payload_is_the_documented_json_shape() {
        let mut jar = MemoryCookies::default();
        {
            let mut store = CookieMarkerStore::new(&mut jar);
            store
                .save(&[marker(7, 22.41, 114.20, "Marker 1")])
                .unwrap();
        }
        let raw = jar.get(MARKER_COOKIE).unwrap();
        assert_eq!(
            raw,
            r#"[{"id":7,"position":[22.41,114.2],"name":"Marker 1"}]"#
        );
    }
}
