use super::*;

fn close(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

#[test]
fn bounds_contains_and_center() {
    let bounds = Bounds::new(13.0, 42.0, 14.0, 43.0);
    assert!(bounds.contains(LatLng::new(42.5, 13.5)));
    assert!(!bounds.contains(LatLng::new(44.0, 13.5)));
    let center = bounds.center();
    assert!(close(center.lat, 42.5, 1e-12));
    assert!(close(center.lon, 13.5, 1e-12));
}

#[test]
fn from_center_at_zoom_zero_covers_the_world() {
    let vp = Viewport::from_center(LatLng::new(0.0, 0.0), 0, 256, 256);
    assert!(close(vp.bounds.west, -180.0, 1e-9));
    assert!(close(vp.bounds.east, 180.0, 1e-9));
    assert!(close(vp.bounds.north, MAX_MERCATOR_LAT, 1e-6));
    assert!(close(vp.bounds.south, -MAX_MERCATOR_LAT, 1e-6));
}

#[test]
fn from_center_is_centered_and_shrinks_with_zoom() {
    let center = LatLng::new(42.3498, 13.3995);
    let wide = Viewport::from_center(center, 14, 800, 600);
    let narrow = Viewport::from_center(center, 15, 800, 600);

    assert!(wide.bounds.contains(center));
    assert!(close((wide.bounds.west + wide.bounds.east) / 2.0, center.lon, 1e-9));

    let wide_span = wide.bounds.east - wide.bounds.west;
    let narrow_span = narrow.bounds.east - narrow.bounds.west;
    assert!(close(wide_span / narrow_span, 2.0, 1e-9));
}

#[test]
fn from_center_longitude_span_matches_pixel_width() {
    // 800px at zoom 14: 800 / (256 * 2^14) of 360 degrees.
    let vp = Viewport::from_center(LatLng::new(42.0, 13.0), 14, 800, 600);
    let expected = 800.0 / (256.0 * 16384.0) * 360.0;
    assert!(close(vp.bounds.east - vp.bounds.west, expected, 1e-9));
}

#[test]
fn from_center_clamps_polar_latitude() {
    let vp = Viewport::from_center(LatLng::new(89.9, 0.0), 3, 512, 512);
    assert!(close(vp.center.lat, MAX_MERCATOR_LAT, 1e-9));
    assert!(vp.bounds.north <= MAX_MERCATOR_LAT + 1e-9);
}
