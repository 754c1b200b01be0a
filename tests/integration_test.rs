extern crate capture360;

use capture360::activities::{sort_most_recent_first, Activity};
use capture360::envelope::{parse_leaders, ApiResponse, Envelope, DEFAULT_GROUP};
use capture360::items::{ProjectUnit, Report};
use capture360::output::Output;
use capture360::reports::{Priority, ReportStatus, ReportsStore};
use capture360::{rank_by_distance, Location};
use geojson::{GeoJson, Value};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};

fn get_string(cursor: &mut Cursor<Vec<u8>>) -> String {
    cursor.seek(SeekFrom::Start(0)).unwrap();
    let mut out = Vec::new();
    cursor.read_to_end(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn load_parks() -> Vec<ProjectUnit> {
    let file = File::open("./tests/data/parks.json").unwrap();
    let response: ApiResponse<ProjectUnit> = serde_json::from_reader(file).unwrap();
    response.into_data().unwrap()
}

fn load_reports() -> Vec<Report> {
    let file = File::open("./tests/data/reports.json").unwrap();
    let response: ApiResponse<Report> = serde_json::from_reader(file).unwrap();
    response.into_data().unwrap()
}

fn feature_collection(string: &str) -> geojson::FeatureCollection {
    match string.trim().parse::<GeoJson>().unwrap() {
        GeoJson::FeatureCollection(collection) => collection,
        other => panic!("expected a feature collection, got {:?}", other),
    }
}

#[test]
fn rank_parks_around_a_position() {
    let parks = load_parks();
    assert_eq!(parks.len(), 4);
    let position: Location = "3.4305,-76.5408".parse().unwrap();
    let ranked = rank_by_distance(&parks, &position);

    let names: Vec<&str> = ranked.iter().map(|n| n.unit.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Parque del Perro",
            "Bulevar del Río",
            "Parque El Ingenio",
            "Ecoparque sin geometría"
        ]
    );
    assert!(ranked[0].distance.unwrap() < 1.);
    assert!(ranked[1].distance.unwrap() > 2_000. && ranked[1].distance.unwrap() < 3_000.);
    assert!(ranked[3].distance.is_none());
}

#[test]
fn parks_as_standard_geojson() {
    let parks = load_parks();
    let ranked = rank_by_distance(&parks, &Location::new(3.4305, -76.5408));
    let mut cursor = Cursor::new(Vec::new());
    ranked.write_geojson(&mut cursor).unwrap();
    let string = get_string(&mut cursor);

    let collection = feature_collection(&string);
    assert_eq!(collection.features.len(), 4);
    let kinds: Vec<Option<&str>> = collection
        .features
        .iter()
        .map(|feature| {
            feature.geometry.as_ref().map(|geometry| match geometry.value {
                Value::Point(_) => "Point",
                Value::LineString(_) => "LineString",
                Value::Polygon(_) => "Polygon",
                _ => "other",
            })
        })
        .collect();
    assert_eq!(
        kinds,
        vec![Some("Point"), Some("LineString"), Some("Polygon"), None]
    );
}

#[test]
fn parks_as_json_lines() {
    let parks = load_parks();
    let ranked = rank_by_distance(&parks, &Location::new(3.4305, -76.5408));
    let mut cursor = Cursor::new(Vec::new());
    ranked[..2].write_json_lines(&mut cursor).unwrap();
    let string = get_string(&mut cursor);
    let lines: Vec<&str> = string.trim().split('\n').collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("UNP-101"));
    assert!(lines[0].contains("query=3.4305,-76.5408"));
}

#[test]
fn track_reports_on_the_board() {
    let mut store = ReportsStore::new();
    store.begin_load();
    store.finish_load(Ok(load_reports()));
    store.change_status("rep-1", ReportStatus::Assigned, "asignado a cuadrilla", "ana", 10, vec![]);
    store.change_status("rep-3", ReportStatus::Closed, "duplicado", "ana", 100, vec![]);
    store.change_priority("rep-2", Priority::Urgent);

    let state = store.state();
    assert!(!state.loading);
    assert_eq!(state.reports[1].report.park_name.as_deref(), Some("Parque sin nombre"));
    assert_eq!(state.active().len(), 2);

    let stats = state.statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status[&ReportStatus::Notified], 1);
    assert_eq!(stats.by_priority[&Priority::Urgent], 1);
    assert_eq!(stats.average_progress, 37);

    let mut cursor = Cursor::new(Vec::new());
    state.reports.write_geojson(&mut cursor).unwrap();
    let string = get_string(&mut cursor);
    let collection = feature_collection(&string);
    assert_eq!(collection.features.len(), 3);
    let first = &collection.features[0];
    let properties = first.properties.as_ref().unwrap();
    assert_eq!(properties["status"], "asignado");
    assert_eq!(properties["priority"], "media");
    assert!(collection.features[2].geometry.is_none());
}

#[test]
fn activities_most_recent_first() {
    let file = File::open("./tests/data/activities.json").unwrap();
    let response: ApiResponse<Activity> = serde_json::from_reader(file).unwrap();
    let mut activities = response.into_data().unwrap();
    sort_most_recent_first(&mut activities);
    let ids: Vec<&str> = activities.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["act-2", "act-1"]);

    let mut cursor = Cursor::new(Vec::new());
    activities.write_geojson(&mut cursor).unwrap();
    let collection = feature_collection(&get_string(&mut cursor));
    assert_eq!(collection.features.len(), 2);
    assert_eq!(
        activities[1].meeting_point.maps_url().unwrap(),
        "https://www.google.com/maps/search/?api=1&query=3.447,-76.537"
    );
}

#[test]
fn normalize_leader_catalogue() {
    let file = File::open("./tests/data/leaders.json").unwrap();
    let envelope: Envelope<serde_json::Value> = serde_json::from_reader(file).unwrap();
    let leaders = parse_leaders(envelope);
    let pairs: Vec<(&str, &str)> = leaders
        .iter()
        .map(|l| (l.name.as_str(), l.group.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Ana Gómez", DEFAULT_GROUP),
            ("ana gómez", "Grupo 1"),
            ("Ángela Mora", "Grupo 3"),
            ("Bruno Díaz", DEFAULT_GROUP),
            ("Carla Ruiz", "Grupo 2"),
            ("Óscar Perea", DEFAULT_GROUP),
        ]
    );
}
