//! Raster map view: a Web Mercator canvas centered on the current focus,
//! with one disc pin per marker. Tile fetching is out of scope; the basemap
//! is a neutral grid aligned to the global tile boundaries so re-centering
//! is visible.

use crate::config::MapConfig;
use crate::state::{Pin, Snapshot};
use crate::types::{GeoPoint, PinKind};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;

const TILE_SIZE: u32 = 256;

const BASEMAP: Rgba<u8> = Rgba([232, 236, 232, 255]);
const GRID_LINE: Rgba<u8> = Rgba([204, 210, 204, 255]);
const PIN_RING: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FOCUS_RING: Rgba<u8> = Rgba([36, 99, 235, 255]);

const PIN_RADIUS: i64 = 7;
const RING_WIDTH: i64 = 2;
const FOCUS_RADIUS: i64 = 12;

/// Pixel radius a click can be from a pin and still activate its popup.
const ACTIVATION_RADIUS: f64 = 14.0;

fn pin_color(kind: PinKind) -> Rgba<u8> {
    match kind {
        PinKind::Default => Rgba([220, 57, 57, 255]),
        PinKind::Predefined => Rgba([235, 146, 36, 255]),
        PinKind::Custom => Rgba([52, 168, 83, 255]),
    }
}

// Global pixel coordinates on the Web Mercator plane at the given zoom.
fn world_pixel(p: GeoPoint, zoom: u8) -> (f64, f64) {
    let p: geo::Point<f64> = p.into();
    let n = 2.0_f64.powi(zoom as i32) * TILE_SIZE as f64;
    let x = (p.x() + 180.0) / 360.0 * n;
    let lat_rad = p.y().to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;
    (x, y)
}

/// Render the snapshot: basemap, every pin, and a highlight ring at the
/// focused position.
pub fn render_map(map: &MapConfig, snapshot: &Snapshot) -> RgbaImage {
    let (cx, cy) = world_pixel(snapshot.focus.position, map.zoom);
    let left = cx - map.width as f64 / 2.0;
    let top = cy - map.height as f64 / 2.0;

    // Basemap rows are independent; fill them in parallel.
    let width = map.width;
    let raw: Vec<u8> = (0..map.height)
        .into_par_iter()
        .flat_map_iter(|y| {
            let wy = top + y as f64;
            (0..width).flat_map(move |x| {
                let wx = left + x as f64;
                let on_grid = wx.rem_euclid(TILE_SIZE as f64) < 1.0
                    || wy.rem_euclid(TILE_SIZE as f64) < 1.0;
                let px = if on_grid { GRID_LINE } else { BASEMAP };
                px.0
            })
        })
        .collect();

    let mut img: RgbaImage =
        ImageBuffer::from_raw(map.width, map.height, raw).unwrap_or_else(|| {
            // from_raw only fails on a size mismatch, which the row math rules out.
            ImageBuffer::from_pixel(map.width, map.height, BASEMAP)
        });

    for pin in snapshot.pins() {
        let (px, py) = world_pixel(pin.position, map.zoom);
        draw_pin(
            &mut img,
            (px - left).round() as i64,
            (py - top).round() as i64,
            pin_color(pin.kind),
        );
    }

    // Focus highlight goes on top, centered on the image by construction.
    draw_ring(
        &mut img,
        (map.width / 2) as i64,
        (map.height / 2) as i64,
        FOCUS_RADIUS,
        FOCUS_RING,
    );

    img
}

fn draw_pin(img: &mut RgbaImage, cx: i64, cy: i64, color: Rgba<u8>) {
    let outer = PIN_RADIUS + RING_WIDTH;
    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let d2 = dx * dx + dy * dy;
            if d2 > outer * outer {
                continue;
            }
            let px = if d2 <= PIN_RADIUS * PIN_RADIUS {
                color
            } else {
                PIN_RING
            };
            put_pixel_checked(img, cx + dx, cy + dy, px);
        }
    }
}

fn draw_ring(img: &mut RgbaImage, cx: i64, cy: i64, radius: i64, color: Rgba<u8>) {
    let inner = radius - RING_WIDTH;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = dx * dx + dy * dy;
            if d2 <= radius * radius && d2 > inner * inner {
                put_pixel_checked(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_checked(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Popup payload for an activated pin: label plus position to 4 decimals.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PinInfo {
    pub name: String,
    pub kind: PinKind,
    pub position: String,
}

/// Resolve a click to the pin it lands on, if any: nearest pin within the
/// activation radius at the configured zoom. Later pins draw on top, so
/// they win ties.
pub fn pin_at(map: &MapConfig, snapshot: &Snapshot, click: GeoPoint) -> Option<PinInfo> {
    let (cx, cy) = world_pixel(click, map.zoom);
    let mut best: Option<(f64, Pin)> = None;
    for pin in snapshot.pins() {
        let (px, py) = world_pixel(pin.position, map.zoom);
        let dist = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
        if dist <= ACTIVATION_RADIUS && best.as_ref().map_or(true, |(d, _)| dist <= *d) {
            best = Some((dist, pin));
        }
    }
    best.map(|(_, pin)| PinInfo {
        name: pin.name,
        kind: pin.kind,
        position: pin.position.display(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MapState, Snapshot};
    use crate::store::{CookieMarkerStore, MemoryCookies};

    fn snapshot_with_click(lat: f64, lng: f64) -> Snapshot {
        let mut state = MapState::init(CookieMarkerStore::new(MemoryCookies::default()), 500);
        state
            .click(GeoPoint::new(lat, lng).unwrap())
            .unwrap()
            .snapshot
    }

    #[test]
    fn world_pixel_maps_the_origin_to_plane_center() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let (x, y) = world_pixel(origin, 1);
        // Zoom 1: a 2x2 tile plane, 512px on a side.
        assert!((x - 256.0).abs() < 1e-9);
        assert!((y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn focused_marker_renders_at_image_center() {
        let map = MapConfig::default();
        let snap = snapshot_with_click(22.41, 114.20);
        let img = render_map(&map, &snap);

        assert_eq!(img.width(), map.width);
        assert_eq!(img.height(), map.height);
        // The new marker is the focus, so its disc sits dead center.
        let center = img.get_pixel(map.width / 2, map.height / 2);
        assert_eq!(*center, pin_color(PinKind::Custom));
    }

    #[test]
    fn click_on_a_pin_activates_its_popup() {
        let map = MapConfig::default();
        let snap = snapshot_with_click(22.41, 114.20);

        let hit = pin_at(&map, &snap, GeoPoint::new(22.41, 114.20).unwrap()).unwrap();
        assert_eq!(hit.name, "Marker 1");
        assert_eq!(hit.position, "22.4100, 114.2000");

        let miss = pin_at(&map, &snap, GeoPoint::new(22.30, 114.00).unwrap());
        assert!(miss.is_none());
    }

    #[test]
    fn shipped_pins_are_activatable_too() {
        let map = MapConfig::default();
        let snap = snapshot_with_click(22.41, 114.20);
        let gate = GeoPoint::new(22.4130455, 114.2087379).unwrap();
        let hit = pin_at(&map, &snap, gate).unwrap();
        assert_eq!(hit.name, "Chung Chi Gate");
        assert_eq!(hit.kind, PinKind::Default);
    }
}
