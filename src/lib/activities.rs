use super::geojson::Geometry;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeetingPoint {
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "comuna_corregimiento", default, skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    #[serde(rename = "barrio_vereda", default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    pub geometry: Geometry,
}

impl MeetingPoint {
    pub fn maps_url(&self) -> Option<String> {
        self.geometry.maps_url()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    #[serde(rename = "Programada")]
    Scheduled,
    #[serde(rename = "En ejecución")]
    Running,
    #[serde(rename = "Finalizada")]
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "tipo_jornada")]
    pub kind: String,
    /// `DD/MM/YYYY`, kept as sent.
    #[serde(rename = "fecha_actividad")]
    pub date: String,
    #[serde(rename = "hora_encuentro")]
    pub meeting_time: String,
    /// Hours.
    #[serde(rename = "duracion_actividad", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "punto_encuentro")]
    pub meeting_point: MeetingPoint,
    #[serde(rename = "objetivo_actividad")]
    pub goal: String,
    #[serde(rename = "personas_requeridas_grupo", default)]
    pub people_per_group: u32,
    #[serde(rename = "grupos_requeridos", default)]
    pub groups: Vec<String>,
    #[serde(rename = "lider_actividad")]
    pub leader: String,
    #[serde(rename = "observaciones", default)]
    pub observations: String,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "marca_temporal", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "estado_actividad", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ActivityState>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// ISO 8601 in the forms the backend emits. Timestamps without an offset are
/// read as UTC, a bare date as its midnight.
fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::<FixedOffset>::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })?;
    Some(Utc.from_utc_datetime(&naive).timestamp_millis())
}

impl Activity {
    /// Milliseconds since the epoch of `marca_temporal`; 0 when missing or
    /// unparseable.
    pub fn timestamp_millis(&self) -> i64 {
        let timestamp = match &self.timestamp {
            Some(timestamp) => timestamp,
            None => return 0,
        };
        match parse_timestamp(timestamp) {
            Some(millis) => millis,
            None => {
                debug!(id = %self.id, %timestamp, "unparseable activity timestamp");
                0
            }
        }
    }
}

/// Most recent first. Ties keep the backend order.
pub fn sort_most_recent_first(activities: &mut [Activity]) {
    activities.sort_by_key(|activity| Reverse(activity.timestamp_millis()));
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeetingPlace {
    #[serde(rename = "direccion")]
    pub address: String,
    pub geometry: Geometry,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduleActivityRequest {
    #[serde(rename = "tipo_jornada")]
    pub kind: String,
    #[serde(rename = "fecha_actividad")]
    pub date: String,
    #[serde(rename = "hora_encuentro")]
    pub meeting_time: String,
    #[serde(rename = "grupos_requeridos")]
    pub groups: Vec<String>,
    #[serde(rename = "lider_actividad")]
    pub leader: String,
    #[serde(rename = "punto_encuentro")]
    pub meeting_point: MeetingPlace,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "objetivo_actividad")]
    pub goal: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduleActivityResponse {
    pub success: bool,
    pub id: String,
    pub message: String,
    #[serde(rename = "marca_temporal")]
    pub timestamp: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Answer of the delete and modify endpoints, which only promise an
/// optional `success` and `message` next to whatever else they return.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MutationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
