use super::geo::{distance_to_geometry, Location};
use super::geojson::{Geometry, GeometryType};
use super::gps::Coordinates;
use super::wkt;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Project unit ids arrive as numbers from some endpoints and as strings
/// from others.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum UnitId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Number(id) => write!(f, "{}", id),
            UnitId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UnitId {
    fn from(id: i64) -> Self {
        UnitId::Number(id)
    }
}

/// The `geometry` field of a project unit: either WKT text or a GeoJSON-like
/// object whose coordinates may themselves be a JSON-encoded string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawGeometry {
    Wkt(String),
    Object {
        #[serde(rename = "type")]
        kind: String,
        coordinates: Value,
    },
}

impl RawGeometry {
    pub fn to_geometry(&self) -> Option<Geometry> {
        match self {
            RawGeometry::Wkt(text) => wkt::parse(text),
            RawGeometry::Object { kind, coordinates } => {
                let kind: GeometryType = match kind.parse() {
                    Ok(kind) => kind,
                    Err(err) => {
                        warn!(error = %err, "ignoring geometry");
                        return None;
                    }
                };
                let coordinates = match coordinates {
                    Value::String(text) => match serde_json::from_str(text) {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(error = %err, "geometry coordinates are not valid JSON");
                            return None;
                        }
                    },
                    value => value.clone(),
                };
                let geometry = Geometry::from_parts(kind, coordinates);
                if geometry.is_none() {
                    warn!(%kind, "malformed geometry coordinates");
                }
                geometry
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectUnit {
    pub upid: UnitId,
    #[serde(rename = "nombre_up")]
    pub name: String,
    #[serde(rename = "nombre_up_detalle", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "tipo_equipamiento", skip_serializing_if = "Option::is_none")]
    pub equipment_type: Option<String>,
    #[serde(rename = "tipo_intervencion", skip_serializing_if = "Option::is_none")]
    pub intervention_type: Option<String>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "avance_obra", skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(rename = "presupuesto_base", skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<RawGeometry>,
    #[serde(rename = "localidad", skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(rename = "direccion", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "alcalde_local", skip_serializing_if = "Option::is_none")]
    pub mayor: Option<String>,
}

impl ProjectUnit {
    pub fn new(upid: impl Into<UnitId>, name: impl Into<String>) -> Self {
        ProjectUnit {
            upid: upid.into(),
            name: name.into(),
            detail: None,
            equipment_type: None,
            intervention_type: None,
            state: None,
            progress: None,
            budget: None,
            geometry: None,
            locality: None,
            address: None,
            mayor: None,
        }
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry.as_ref()?.to_geometry()
    }

    pub fn distance_from(&self, position: &Location) -> Option<f64> {
        distance_to_geometry(position, self.geometry().as_ref())
    }

    pub fn maps_url(&self) -> Option<String> {
        self.geometry()?.maps_url()
    }
}

pub struct NearbyUnit<'a> {
    pub unit: &'a ProjectUnit,
    pub distance: Option<f64>,
}

/// Orders units by distance to `position`; units without a measurable
/// geometry keep their relative order at the end.
pub fn rank_by_distance<'a>(units: &'a [ProjectUnit], position: &Location) -> Vec<NearbyUnit<'a>> {
    let mut ranked: Vec<NearbyUnit> = units
        .iter()
        .map(|unit| NearbyUnit {
            unit,
            distance: unit.distance_from(position),
        })
        .collect();
    ranked.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
}

/// A report as returned by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upid: Option<UnitId>,
    #[serde(rename = "nombre_parque", default)]
    pub park_name: Option<String>,
    #[serde(rename = "tipo_intervencion", default)]
    pub intervention_type: Option<String>,
    #[serde(rename = "descripcion_intervencion", default)]
    pub intervention_description: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "observaciones", default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub coordinates_type: Option<String>,
    #[serde(default)]
    pub coordinates_data: Option<String>,
    #[serde(default)]
    pub photos_url: Vec<String>,
    #[serde(rename = "fecha_registro")]
    pub registered_at: String,
}

impl Report {
    /// The report's capture location, decoded from its coordinate fields.
    pub fn geometry(&self) -> Option<Geometry> {
        let kind = self.coordinates_type.as_deref().unwrap_or("Point");
        let data = self.coordinates_data.as_ref()?;
        RawGeometry::Object {
            kind: kind.into(),
            coordinates: Value::String(data.clone()),
        }
        .to_geometry()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Form data of the three-step park recognition flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDraft {
    pub upid: Option<UnitId>,
    pub park_name: Option<String>,
    pub address: Option<String>,
    pub intervention_type: Option<String>,
    pub intervention_description: Option<String>,
    pub observations: Option<String>,
    pub gps: Option<Coordinates>,
    pub coordinates_type: Option<String>,
    pub coordinates_data: Option<String>,
    pub photos: Vec<Photo>,
    pub registered_at: String,
}

impl ReportDraft {
    pub fn new() -> Self {
        ReportDraft {
            registered_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }
}

/// A partial update of a [`ReportDraft`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
    pub intervention_type: Option<String>,
    pub intervention_description: Option<String>,
    pub observations: Option<String>,
    pub address: Option<String>,
}

impl ReportPatch {
    pub fn apply(self, draft: &ReportDraft) -> ReportDraft {
        let draft = draft.clone();
        ReportDraft {
            intervention_type: self.intervention_type.or(draft.intervention_type),
            intervention_description: self
                .intervention_description
                .or(draft.intervention_description),
            observations: self.observations.or(draft.observations),
            address: self.address.or(draft.address),
            ..draft
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisitType {
    Verificacion,
    Comunicaciones,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage360 {
    Antes,
    Durante,
    #[serde(rename = "Después")]
    Despues,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataValidation {
    #[serde(rename = "esCorrecta")]
    pub is_correct: bool,
    /// Required when the data was marked as incorrect.
    #[serde(rename = "comentario", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SurroundingUnit {
    pub id: String,
    #[serde(rename = "centro_gestor")]
    pub managing_center: String,
    #[serde(rename = "descripcion_complemento")]
    pub description: String,
}

/// Form data of the five-step verification visit flow, serialized as the
/// record sent to the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VerificationDraft {
    #[serde(rename = "tipo_visita")]
    pub visit_type: Option<VisitType>,
    pub upid: Option<UnitId>,
    #[serde(rename = "nombre_up")]
    pub unit_name: Option<String>,
    #[serde(rename = "validacion")]
    pub validation: Option<DataValidation>,
    #[serde(rename = "coordenadas_gps")]
    pub gps: Option<Coordinates>,
    #[serde(rename = "descripcion_intervencion")]
    pub intervention_description: Option<String>,
    #[serde(rename = "descripcion_solicitud")]
    pub request_description: Option<String>,
    #[serde(rename = "up_entorno", default)]
    pub surroundings: Vec<SurroundingUnit>,
    #[serde(rename = "estado_360")]
    pub stage_360: Option<Stage360>,
    #[serde(rename = "viabilidad_alcalde")]
    pub mayor_viability: Option<bool>,
    #[serde(rename = "entrega_publica")]
    pub public_delivery: Option<bool>,
    #[serde(default)]
    pub photos_url: Vec<String>,
    #[serde(rename = "fecha_registro")]
    pub registered_at: String,
    #[serde(rename = "usuario_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecognitionResponse {
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub photos_url: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit(geometry: Value) -> ProjectUnit {
        let mut unit = ProjectUnit::new(1, "Parque");
        unit.geometry = serde_json::from_value(geometry).unwrap();
        unit
    }

    #[test]
    fn deserialize_unit() {
        let unit: ProjectUnit = serde_json::from_value(json!({
            "upid": "UNP-12",
            "nombre_up": "Parque El Ingenio",
            "tipo_equipamiento": "Parques",
            "estado": "En ejecución",
            "avance_obra": null,
            "geometry": "POINT(-76.53 3.39)"
        }))
        .unwrap();
        assert_eq!(unit.upid, UnitId::Text("UNP-12".into()));
        assert_eq!(unit.progress, None);
        assert_eq!(
            unit.geometry(),
            Some(Geometry::Point {
                coordinates: (-76.53, 3.39)
            })
        );
    }

    #[test]
    fn geometry_with_string_coordinates() {
        let unit = unit(json!({
            "type": "LineString",
            "coordinates": "[[-76.5, 3.4], [-76.6, 3.5]]"
        }));
        assert_eq!(
            unit.geometry(),
            Some(Geometry::LineString {
                coordinates: vec![(-76.5, 3.4), (-76.6, 3.5)]
            })
        );
    }

    #[test]
    fn unsupported_geometry_type() {
        let unit = unit(json!({
            "type": "GeometryCollection",
            "coordinates": []
        }));
        assert_eq!(unit.geometry(), None);
        assert_eq!(unit.distance_from(&Location::new(0., 0.)), None);
        assert_eq!(unit.maps_url(), None);
    }

    #[test]
    fn ranking_puts_unmeasurable_units_last() {
        let far = unit(json!("POINT(10 10)"));
        let near = unit(json!("POINT(0 1)"));
        let unknown = unit(json!("FOOBAR(1 2)"));
        let units = vec![unknown, far, near];
        let ranked = rank_by_distance(&units, &Location::new(0., 0.));
        let order: Vec<Option<Geometry>> = ranked.iter().map(|n| n.unit.geometry()).collect();
        assert_eq!(
            order,
            vec![
                Some(Geometry::Point {
                    coordinates: (0., 1.)
                }),
                Some(Geometry::Point {
                    coordinates: (10., 10.)
                }),
                None
            ]
        );
        assert!(ranked[2].distance.is_none());
    }

    #[test]
    fn report_geometry_from_coordinate_fields() {
        let report: Report = serde_json::from_value(json!({
            "id": "r-1",
            "coordinates_type": "Point",
            "coordinates_data": "[-76.5225, 3.4516]",
            "fecha_registro": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            report.geometry(),
            Some(Geometry::Point {
                coordinates: (-76.5225, 3.4516)
            })
        );
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let draft = ReportDraft {
            intervention_type: Some("Poda".into()),
            observations: Some("none".into()),
            ..Default::default()
        };
        let patch = ReportPatch {
            intervention_description: Some("Poda de árboles".into()),
            observations: Some("ok".into()),
            ..Default::default()
        };
        let patched = patch.apply(&draft);
        assert_eq!(patched.intervention_type.as_deref(), Some("Poda"));
        assert_eq!(
            patched.intervention_description.as_deref(),
            Some("Poda de árboles")
        );
        assert_eq!(patched.observations.as_deref(), Some("ok"));
    }

    #[test]
    fn verification_draft_wire_names() {
        let draft = VerificationDraft {
            visit_type: Some(VisitType::Verificacion),
            stage_360: Some(Stage360::Despues),
            ..Default::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["tipo_visita"], json!("verificacion"));
        assert_eq!(value["estado_360"], json!("Después"));
    }
}
