use super::activities::Activity;
use super::geojson::Entity;
use super::items::{NearbyUnit, UnitId};
use super::reports::TrackedReport;
use serde::Serialize;
use serde_json::to_string;
use std::collections::HashMap;
use std::error::Error;
use std::io::Write;

pub trait Output {
    fn write_geojson(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>>;
    fn write_json_lines(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>>;
}

fn write_collection(features: Vec<Entity>, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let feature_collection = Entity::FeatureCollection { features };
    let string = to_string(&feature_collection)?;
    writeln!(writer, "{}", string)?;
    Ok(())
}

fn insert_some(properties: &mut HashMap<String, String>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        properties.insert(key.into(), value.clone());
    }
}

#[derive(Serialize)]
struct JSONUnit<'a> {
    upid: &'a UnitId,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maps_url: Option<String>,
}

impl Output for [NearbyUnit<'_>] {
    fn write_json_lines(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        for nearby in self.iter() {
            let json_unit = JSONUnit {
                upid: &nearby.unit.upid,
                name: &nearby.unit.name,
                distance: nearby.distance.map(f64::round),
                maps_url: nearby.unit.maps_url(),
            };
            let json = to_string(&json_unit)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    fn write_geojson(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        let features = self
            .iter()
            .map(|nearby| {
                let unit = nearby.unit;
                let mut properties = HashMap::new();
                properties.insert("upid".to_string(), unit.upid.to_string());
                properties.insert("name".to_string(), unit.name.clone());
                insert_some(&mut properties, "state", unit.state.as_ref());
                insert_some(&mut properties, "address", unit.address.as_ref());
                if let Some(distance) = nearby.distance {
                    properties.insert("distance".into(), format!("{:.0}", distance));
                }
                Entity::Feature {
                    geometry: unit.geometry(),
                    properties,
                }
            })
            .collect();
        write_collection(features, writer)
    }
}

#[derive(Serialize)]
struct JSONReport<'a> {
    id: &'a str,
    park: Option<&'a String>,
    status: String,
    priority: String,
    progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    maps_url: Option<String>,
}

fn wire_name<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(name) => Ok(name),
        other => Ok(other.to_string()),
    }
}

impl Output for [TrackedReport] {
    fn write_json_lines(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        for tracked in self.iter() {
            let json_report = JSONReport {
                id: &tracked.report.id,
                park: tracked.report.park_name.as_ref(),
                status: wire_name(&tracked.status)?,
                priority: wire_name(&tracked.priority)?,
                progress: tracked.progress,
                maps_url: tracked.report.geometry().and_then(|g| g.maps_url()),
            };
            let json = to_string(&json_report)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    fn write_geojson(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        let mut features = vec![];
        for tracked in self.iter() {
            let report = &tracked.report;
            let mut properties = HashMap::new();
            properties.insert("id".to_string(), report.id.clone());
            insert_some(&mut properties, "park", report.park_name.as_ref());
            insert_some(&mut properties, "intervention", report.intervention_type.as_ref());
            properties.insert("status".into(), wire_name(&tracked.status)?);
            properties.insert("priority".into(), wire_name(&tracked.priority)?);
            properties.insert("marker-color".into(), tracked.status.color().into());
            features.push(Entity::Feature {
                geometry: report.geometry(),
                properties,
            });
        }
        write_collection(features, writer)
    }
}

impl Output for [Activity] {
    fn write_json_lines(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        for activity in self.iter() {
            let json = to_string(activity)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    fn write_geojson(&self, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        let features = self
            .iter()
            .map(|activity| {
                let mut properties = HashMap::new();
                properties.insert("id".to_string(), activity.id.clone());
                properties.insert("kind".to_string(), activity.kind.clone());
                properties.insert("date".to_string(), activity.date.clone());
                properties.insert("leader".to_string(), activity.leader.clone());
                properties.insert(
                    "address".to_string(),
                    activity.meeting_point.address.clone(),
                );
                Entity::Feature {
                    geometry: Some(activity.meeting_point.geometry.clone()),
                    properties,
                }
            })
            .collect();
        write_collection(features, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ProjectUnit;
    use crate::test_helpers::park;
    use serde_json::Value;

    #[test]
    fn units_as_feature_collection() {
        let units = vec![park(1, "Parque A", "POINT(-76.5 3.4)"), ProjectUnit::new(2, "B")];
        let nearby: Vec<NearbyUnit> = units
            .iter()
            .map(|unit| NearbyUnit {
                unit,
                distance: Some(12.4),
            })
            .collect();
        let mut out = vec![];
        nearby.write_geojson(&mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["properties"]["distance"], "12");
        assert!(features[1]["geometry"].is_null());
    }

    #[test]
    fn units_as_json_lines() {
        let units = vec![park(7, "Parque A", "POINT(-76.5 3.4)")];
        let nearby = vec![NearbyUnit {
            unit: &units[0],
            distance: None,
        }];
        let mut out = vec![];
        nearby.write_json_lines(&mut out).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(line.lines().count(), 1);
        assert!(line.contains(r#""upid":7"#));
        assert!(line.contains("query=3.4,-76.5"));
        assert!(!line.contains("distance"));
    }
}
