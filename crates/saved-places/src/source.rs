//! Feature sources: GeoJSON exports and GPX 1.1 waypoint files.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde_json::Value;

use crate::error::{ImportError, ImportResult};
use crate::types::{Feature, FeatureList, SourceFormat, Waypoint};

/// Property holding the place URL in GeoJSON exports.
pub const GOOGLE_MAPS_URL_KEY: &str = "Google Maps URL";

/// GPX 1.1 schema namespace.
pub const GPX_NAMESPACE: &[u8] = b"http://www.topografix.com/GPX/1/1";

/// Read and parse the features in `path`.
///
/// The format is decided from the extension before the file is opened, so an
/// unsupported file never causes I/O.
pub fn load_features(path: &Path) -> ImportResult<FeatureList> {
    let format = SourceFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| ImportError::from_io(path, e))?;

    let features = match format {
        SourceFormat::GeoJson => parse_geo_json(&text)?,
        SourceFormat::Gpx => parse_gpx(&text)?,
    };
    tracing::debug!(
        "parsed {} {} features from {}",
        features.len(),
        format,
        path.display()
    );

    Ok(FeatureList { format, features })
}

/// Extract the place URL of every feature in a GeoJSON feature collection.
///
/// A feature without `properties` or without the URL property fails the
/// whole document.
pub fn parse_geo_json(text: &str) -> ImportResult<Vec<Feature>> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| ImportError::MalformedInput(format!("invalid GeoJSON: {e}")))?;

    let features = doc.get("features").ok_or_else(|| {
        ImportError::MalformedInput("No 'features' key in GeoJSON found".to_string())
    })?;
    let features = features.as_array().ok_or_else(|| {
        ImportError::MalformedInput("GeoJSON 'features' is not an array".to_string())
    })?;

    features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let properties = feature
                .get("properties")
                .and_then(Value::as_object)
                .ok_or(ImportError::InvalidProperty {
                    position: i + 1,
                    field: "properties",
                })?;
            properties
                .get(GOOGLE_MAPS_URL_KEY)
                .and_then(Value::as_str)
                .map(Feature::url)
                .ok_or(ImportError::InvalidProperty {
                    position: i + 1,
                    field: GOOGLE_MAPS_URL_KEY,
                })
        })
        .collect()
}

/// Extract the waypoints that are direct children of the GPX root element.
pub fn parse_gpx(text: &str) -> ImportResult<Vec<Feature>> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut waypoints = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut current: Option<Waypoint> = None;
    let mut in_name = false;

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((_, Event::Start(e))) if depth == 1 && is_waypoint(&e) => {
                current = Some(waypoint_from_attributes(&e, waypoints.len() + 1)?);
                depth += 1;
            }
            Ok((ns, Event::Start(e))) => {
                if depth == 0 {
                    seen_root = true;
                }
                if depth == 2 && current.is_some() && e.local_name().as_ref() == b"name" {
                    in_name = is_gpx_namespace(&ns);
                }
                depth += 1;
            }
            Ok((_, Event::Empty(e))) => {
                if depth == 0 {
                    seen_root = true;
                } else if depth == 1 && is_waypoint(&e) {
                    let wpt = waypoint_from_attributes(&e, waypoints.len() + 1)?;
                    waypoints.push(Feature::Waypoint(wpt));
                }
            }
            Ok((_, Event::Text(t))) if in_name => {
                let text = t
                    .unescape()
                    .map_err(|e| ImportError::MalformedInput(format!("GPX parse error: {e}")))?;
                if let Some(wpt) = current.as_mut() {
                    wpt.name.push_str(&text);
                }
            }
            Ok((_, Event::CData(t))) if in_name => {
                if let Some(wpt) = current.as_mut() {
                    wpt.name.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok((_, Event::End(_))) => {
                depth = depth.saturating_sub(1);
                if depth == 2 {
                    in_name = false;
                } else if depth == 1 {
                    if let Some(wpt) = current.take() {
                        waypoints.push(Feature::Waypoint(wpt));
                    }
                }
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(ImportError::MalformedInput(format!(
                    "GPX parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ImportError::MalformedInput(
            "GPX document has no root element".to_string(),
        ));
    }
    Ok(waypoints)
}

fn is_waypoint(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == b"wpt"
}

// Unprefixed names in hand-written files without an xmlns are accepted too.
fn is_gpx_namespace(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == GPX_NAMESPACE,
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

fn waypoint_from_attributes(e: &BytesStart<'_>, position: usize) -> ImportResult<Waypoint> {
    let lat = coordinate(e, "lat", position)?;
    let lon = coordinate(e, "lon", position)?;
    Ok(Waypoint {
        lat,
        lon,
        name: String::new(),
    })
}

fn coordinate(e: &BytesStart<'_>, field: &'static str, position: usize) -> ImportResult<f64> {
    let invalid = || ImportError::InvalidProperty { position, field };
    let attr = e
        .try_get_attribute(field)
        .map_err(|err| ImportError::MalformedInput(format!("GPX parse error: {err}")))?
        .ok_or_else(invalid)?;
    let value = attr
        .unescape_value()
        .map_err(|err| ImportError::MalformedInput(format!("GPX parse error: {err}")))?;
    let value = value.trim().parse::<f64>().map_err(|_| invalid())?;
    let limit = if field == "lat" { 90.0 } else { 180.0 };
    if !value.is_finite() || value.abs() > limit {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GEO_JSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [13.3777, 52.5163] },
                "properties": {
                    "Google Maps URL": "http://maps.google.com/?cid=1111",
                    "Title": "Brandenburger Tor"
                }
            },
            {
                "type": "Feature",
                "properties": { "Google Maps URL": "http://maps.google.com/?cid=2222" }
            },
            {
                "type": "Feature",
                "properties": { "Google Maps URL": "http://maps.google.com/?cid=3333" }
            }
        ]
    }"#;

    const GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
          <metadata><name>Trip</name></metadata>
          <wpt lat="52.5163" lon="13.3777"><name>Brandenburger Tor</name></wpt>
          <wpt lat="48.8584" lon="2.2945">
            <ele>35</ele>
            <name>Tour Eiffel &amp; Champ de Mars</name>
          </wpt>
          <wpt lat="41.8902" lon="12.4922"/>
        </gpx>"#;

    #[test]
    fn test_geo_json_preserves_order() {
        let features = parse_geo_json(GEO_JSON).unwrap();
        assert_eq!(
            features,
            vec![
                Feature::url("http://maps.google.com/?cid=1111"),
                Feature::url("http://maps.google.com/?cid=2222"),
                Feature::url("http://maps.google.com/?cid=3333"),
            ]
        );
    }

    #[test]
    fn test_geo_json_empty_features() {
        let features = parse_geo_json(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_geo_json_without_features_key() {
        let err = parse_geo_json(r#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput(_)));
        assert!(err.to_string().contains("features"));
    }

    #[test]
    fn test_geo_json_missing_url_fails_batch() {
        let text = r#"{"features":[
            {"properties":{"Google Maps URL":"http://maps.google.com/?cid=1"}},
            {"properties":{"Title":"no url"}}
        ]}"#;
        let err = parse_geo_json(text).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidProperty {
                position: 2,
                field: GOOGLE_MAPS_URL_KEY
            }
        ));
    }

    #[test]
    fn test_geo_json_missing_properties() {
        let err = parse_geo_json(r#"{"features":[{"type":"Feature"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidProperty {
                position: 1,
                field: "properties"
            }
        ));
    }

    #[test]
    fn test_geo_json_syntax_error() {
        let err = parse_geo_json("{\"features\": [").unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput(_)));
    }

    #[test]
    fn test_gpx_waypoints_in_order() {
        let features = parse_gpx(GPX).unwrap();
        assert_eq!(features.len(), 3);
        match &features[0] {
            Feature::Waypoint(w) => {
                assert_eq!(w.lat, 52.5163);
                assert_eq!(w.lon, 13.3777);
                assert_eq!(w.name, "Brandenburger Tor");
            }
            other => panic!("expected waypoint, got {other:?}"),
        }
        match &features[1] {
            Feature::Waypoint(w) => assert_eq!(w.name, "Tour Eiffel & Champ de Mars"),
            other => panic!("expected waypoint, got {other:?}"),
        }
        match &features[2] {
            Feature::Waypoint(w) => {
                assert_eq!(w.lat, 41.8902);
                assert!(w.name.is_empty());
            }
            other => panic!("expected waypoint, got {other:?}"),
        }
    }

    #[test]
    fn test_gpx_ignores_foreign_name_namespace() {
        let text = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" xmlns:x="urn:other">
            <wpt lat="1" lon="2"><x:name>wrong</x:name><name>right</name></wpt>
        </gpx>"#;
        let features = parse_gpx(text).unwrap();
        match &features[0] {
            Feature::Waypoint(w) => assert_eq!(w.name, "right"),
            other => panic!("expected waypoint, got {other:?}"),
        }
    }

    #[test]
    fn test_gpx_missing_coordinate() {
        let text = r#"<gpx><wpt lat="1"><name>x</name></wpt></gpx>"#;
        let err = parse_gpx(text).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidProperty {
                position: 1,
                field: "lon"
            }
        ));
    }

    #[test]
    fn test_gpx_non_finite_coordinate() {
        let text = r#"<gpx><wpt lat="NaN" lon="inf"><name>x</name></wpt></gpx>"#;
        assert!(matches!(
            parse_gpx(text),
            Err(ImportError::InvalidProperty {
                position: 1,
                field: "lat"
            })
        ));

        let text = r#"<gpx><wpt lat="1" lon="-inf"/></gpx>"#;
        assert!(matches!(
            parse_gpx(text),
            Err(ImportError::InvalidProperty { field: "lon", .. })
        ));
    }

    #[test]
    fn test_gpx_out_of_range_coordinate() {
        let text = r#"<gpx>
            <wpt lat="10" lon="20"/>
            <wpt lat="999" lon="0"/>
        </gpx>"#;
        assert!(matches!(
            parse_gpx(text),
            Err(ImportError::InvalidProperty {
                position: 2,
                field: "lat"
            })
        ));

        let text = r#"<gpx><wpt lat="0" lon="180.5"/></gpx>"#;
        assert!(matches!(
            parse_gpx(text),
            Err(ImportError::InvalidProperty { field: "lon", .. })
        ));

        let edges = r#"<gpx><wpt lat="-90" lon="180"/></gpx>"#;
        assert_eq!(parse_gpx(edges).unwrap().len(), 1);
    }

    #[test]
    fn test_gpx_empty_document() {
        assert!(matches!(
            parse_gpx(""),
            Err(ImportError::MalformedInput(_))
        ));
        assert!(parse_gpx("<gpx/>").unwrap().is_empty());
    }

    /// Parser must never panic on arbitrary input.
    #[test]
    fn test_fuzz_gpx_parser() {
        let inputs = [
            "not xml at all",
            "<",
            "<gpx><wpt>",
            "<gpx><wpt lat=\"x\" lon=\"y\"/></gpx>",
            "<<<>>>",
            "\x00\x01\x02",
            &"<wpt>".repeat(1000),
        ];
        for input in &inputs {
            let _ = parse_gpx(input);
        }
    }

    #[test]
    fn test_load_features_unsupported_never_opens_file() {
        let err = load_features(Path::new("/definitely/not/here.kml")).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_load_features_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_features(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ImportError::NotFound { .. }));
    }

    #[test]
    fn test_load_features_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.gpx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(GPX.as_bytes()).unwrap();

        let list = load_features(&path).unwrap();
        assert_eq!(list.format, SourceFormat::Gpx);
        assert_eq!(list.len(), 3);
    }
}
