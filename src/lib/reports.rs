//! Status tracking of submitted reports: a small kanban workflow kept on the
//! client on top of the plain reports returned by the backend.

use super::client::ApiClient;
use super::error::Result;
use super::items::Report;
use super::store::{Store, SubscriptionId};
use chrono::Utc;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

pub const SYSTEM_AUTHOR: &str = "Sistema";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportStatus {
    #[serde(rename = "notificado")]
    Notified,
    #[serde(rename = "radicado")]
    Filed,
    #[serde(rename = "en-gestion")]
    InManagement,
    #[serde(rename = "asignado")]
    Assigned,
    #[serde(rename = "en-proceso")]
    InProgress,
    #[serde(rename = "resuelto")]
    Resolved,
    #[serde(rename = "cerrado")]
    Closed,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 7] = [
        ReportStatus::Notified,
        ReportStatus::Filed,
        ReportStatus::InManagement,
        ReportStatus::Assigned,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
        ReportStatus::Closed,
    ];

    pub fn color(self) -> &'static str {
        KANBAN_COLUMNS
            .iter()
            .find(|column| column.status == self)
            .map_or(FALLBACK_COLOR, |column| column.color)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    #[serde(rename = "baja")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "urgente")]
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn color(self) -> &'static str {
        match self {
            Priority::Low => "#10b981",
            Priority::Medium => "#f59e0b",
            Priority::High => "#ef4444",
            Priority::Urgent => "#dc2626",
        }
    }
}

pub const FALLBACK_COLOR: &str = "#94a3b8";

pub struct KanbanColumn {
    pub status: ReportStatus,
    pub title: &'static str,
    pub color: &'static str,
}

pub const KANBAN_COLUMNS: [KanbanColumn; 4] = [
    KanbanColumn {
        status: ReportStatus::Notified,
        title: "Notificados",
        color: "#6b7280",
    },
    KanbanColumn {
        status: ReportStatus::Assigned,
        title: "Asignados",
        color: "#8b5cf6",
    },
    KanbanColumn {
        status: ReportStatus::InProgress,
        title: "En Proceso",
        color: "#ec4899",
    },
    KanbanColumn {
        status: ReportStatus::Resolved,
        title: "Resueltos",
        color: "#10b981",
    },
];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    #[serde(rename = "foto")]
    Photo,
    #[serde(rename = "documento")]
    Document,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Evidence {
    #[serde(rename = "tipo")]
    pub kind: EvidenceKind,
    pub url: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub id: String,
    #[serde(rename = "reporte_id")]
    pub report_id: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "autor")]
    pub author: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "estado_anterior")]
    pub previous_status: ReportStatus,
    #[serde(rename = "estado_nuevo")]
    pub new_status: ReportStatus,
    #[serde(rename = "porcentaje")]
    pub percentage: u8,
    #[serde(rename = "evidencias")]
    pub evidence: Vec<Evidence>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackedReport {
    #[serde(flatten)]
    pub report: Report,
    #[serde(rename = "estado")]
    pub status: ReportStatus,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "porcentaje_avance")]
    pub progress: u8,
    #[serde(rename = "encargado", skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(rename = "centro_gestor", skip_serializing_if = "Option::is_none")]
    pub managing_center: Option<String>,
    #[serde(rename = "historial")]
    pub history: Vec<ProgressRecord>,
    pub updated_at: String,
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

fn random_suffix() -> String {
    let mut rng = thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0, BASE36.len())] as char)
        .collect()
}

/// `rep-<millis>-<random>`
pub fn generate_report_id() -> String {
    format!("rep-{}-{}", Utc::now().timestamp_millis(), random_suffix())
}

/// `avance-<millis>-<random>`
pub fn generate_progress_id() -> String {
    format!("avance-{}-{}", Utc::now().timestamp_millis(), random_suffix())
}

fn or_placeholder(field: Option<String>, placeholder: &str) -> Option<String> {
    match field {
        Some(value) if !value.is_empty() => Some(value),
        _ => Some(placeholder.into()),
    }
}

/// Wraps a backend report into a tracked one: placeholders for missing
/// texts, notified, medium priority, and a single creation entry.
pub fn track(report: Report) -> TrackedReport {
    let report = Report {
        park_name: or_placeholder(report.park_name, "Parque sin nombre"),
        intervention_type: or_placeholder(report.intervention_type, "Sin especificar"),
        intervention_description: or_placeholder(
            report.intervention_description,
            "Sin descripción",
        ),
        address: or_placeholder(report.address, "Sin dirección"),
        ..report
    };
    let created = ProgressRecord {
        id: generate_progress_id(),
        report_id: report.id.clone(),
        date: report.registered_at.clone(),
        author: SYSTEM_AUTHOR.into(),
        description: "Reporte creado y notificado".into(),
        previous_status: ReportStatus::Notified,
        new_status: ReportStatus::Notified,
        percentage: 0,
        evidence: vec![],
    };
    TrackedReport {
        updated_at: report.registered_at.clone(),
        report,
        status: ReportStatus::Notified,
        priority: Priority::Medium,
        progress: 0,
        manager: None,
        managing_center: None,
        history: vec![created],
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total: usize,
    pub by_status: BTreeMap<ReportStatus, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub average_progress: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportsState {
    pub reports: Vec<TrackedReport>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ReportsState {
    /// Reports grouped per status, every status present even when empty.
    pub fn by_status(&self) -> BTreeMap<ReportStatus, Vec<&TrackedReport>> {
        let mut grouped: BTreeMap<ReportStatus, Vec<&TrackedReport>> = ReportStatus::ALL
            .iter()
            .map(|status| (*status, vec![]))
            .collect();
        for report in &self.reports {
            grouped.entry(report.status).or_default().push(report);
        }
        grouped
    }

    pub fn active(&self) -> Vec<&TrackedReport> {
        self.reports
            .iter()
            .filter(|report| report.status != ReportStatus::Closed)
            .collect()
    }

    pub fn statistics(&self) -> Statistics {
        let total = self.reports.len();
        let mut by_status: BTreeMap<ReportStatus, usize> =
            ReportStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_priority: BTreeMap<Priority, usize> =
            Priority::ALL.iter().map(|p| (*p, 0)).collect();
        let mut progress_sum = 0u64;
        for report in &self.reports {
            *by_status.entry(report.status).or_default() += 1;
            *by_priority.entry(report.priority).or_default() += 1;
            progress_sum += u64::from(report.progress);
        }
        let average_progress = if total > 0 {
            (progress_sum as f64 / total as f64).round() as u8
        } else {
            0
        };
        Statistics {
            total,
            by_status,
            by_priority,
            average_progress,
        }
    }
}

/// Applies `change` to the report with `id`, stamping `updated_at`. Unknown
/// ids leave the state as it was.
fn with_report<F>(state: &ReportsState, id: &str, change: F) -> ReportsState
where
    F: FnOnce(&TrackedReport) -> TrackedReport,
{
    let mut next = state.clone();
    if let Some(report) = next.reports.iter_mut().find(|r| r.report.id == id) {
        *report = TrackedReport {
            updated_at: Utc::now().to_rfc3339(),
            ..change(&*report)
        };
    }
    next
}

#[derive(Debug)]
pub struct ReportsStore {
    store: Store<ReportsState>,
}

impl Default for ReportsStore {
    fn default() -> Self {
        ReportsStore {
            store: Store::new(ReportsState::default()),
        }
    }
}

impl ReportsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReportsState {
        self.store.get()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ReportsState) + 'static,
    {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn begin_load(&mut self) {
        self.store.update(|state| ReportsState {
            loading: true,
            error: None,
            ..state.clone()
        });
    }

    pub fn finish_load(&mut self, result: Result<Vec<Report>>) {
        match result {
            Ok(reports) => {
                info!(count = reports.len(), "reports loaded");
                let reports = reports.into_iter().map(track).collect();
                self.store.update(|state| ReportsState {
                    reports,
                    loading: false,
                    ..state.clone()
                });
            }
            Err(err) => {
                error!(error = %err, "could not load reports");
                self.store.update(|state| ReportsState {
                    loading: false,
                    error: Some("Error al cargar los reportes".into()),
                    ..state.clone()
                });
            }
        }
    }

    pub async fn load(&mut self, client: &ApiClient) {
        self.begin_load();
        let result = client.reports().await;
        self.finish_load(result);
    }

    pub fn change_status(
        &mut self,
        report_id: &str,
        new_status: ReportStatus,
        description: &str,
        author: &str,
        percentage: u8,
        evidence: Vec<Evidence>,
    ) {
        let percentage = percentage.min(100);
        self.store.update(|state| {
            with_report(state, report_id, |report| {
                let record = ProgressRecord {
                    id: generate_progress_id(),
                    report_id: report_id.into(),
                    date: Utc::now().to_rfc3339(),
                    author: author.into(),
                    description: description.into(),
                    previous_status: report.status,
                    new_status,
                    percentage,
                    evidence,
                };
                let mut history = report.history.clone();
                history.push(record);
                TrackedReport {
                    status: new_status,
                    progress: percentage,
                    history,
                    ..report.clone()
                }
            })
        });
    }

    pub fn assign_manager(&mut self, report_id: &str, manager: &str) {
        self.store.update(|state| {
            with_report(state, report_id, |report| TrackedReport {
                manager: Some(manager.into()),
                ..report.clone()
            })
        });
    }

    pub fn change_priority(&mut self, report_id: &str, priority: Priority) {
        self.store.update(|state| {
            with_report(state, report_id, |report| TrackedReport {
                priority,
                ..report.clone()
            })
        });
    }

    pub fn assign_center(&mut self, report_id: &str, center: &str) {
        self.store.update(|state| {
            with_report(state, report_id, |report| TrackedReport {
                managing_center: Some(center.into()),
                ..report.clone()
            })
        });
    }

    pub fn reset(&mut self) {
        self.store.set(ReportsState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn report(id: &str) -> Report {
        Report {
            id: id.into(),
            upid: None,
            park_name: None,
            intervention_type: Some("Poda".into()),
            intervention_description: Some(String::new()),
            address: None,
            observations: None,
            coordinates_type: None,
            coordinates_data: None,
            photos_url: vec![],
            registered_at: "2024-05-01T10:00:00Z".into(),
        }
    }

    fn loaded(ids: &[&str]) -> ReportsStore {
        let mut store = ReportsStore::new();
        store.begin_load();
        assert!(store.state().loading);
        store.finish_load(Ok(ids.iter().map(|id| report(id)).collect()));
        store
    }

    #[test]
    fn track_fills_defaults() {
        let tracked = track(report("r-1"));
        assert_eq!(tracked.report.park_name.as_deref(), Some("Parque sin nombre"));
        assert_eq!(tracked.report.intervention_type.as_deref(), Some("Poda"));
        assert_eq!(
            tracked.report.intervention_description.as_deref(),
            Some("Sin descripción")
        );
        assert_eq!(tracked.status, ReportStatus::Notified);
        assert_eq!(tracked.priority, Priority::Medium);
        assert_eq!(tracked.history.len(), 1);
        assert_eq!(tracked.history[0].author, SYSTEM_AUTHOR);
        assert_eq!(tracked.updated_at, "2024-05-01T10:00:00Z");
    }

    #[test]
    fn generated_ids() {
        let id = generate_progress_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "avance");
        assert_eq!(parts[2].len(), 9);
        assert!(generate_report_id().starts_with("rep-"));
    }

    #[test]
    fn suffix_is_uniform_base36() {
        let sample: String = (0..1000).map(|_| random_suffix()).collect();
        assert!(sample
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        // 10 of 36 symbols are digits
        let digits = sample.chars().filter(char::is_ascii_digit).count() as f64;
        let share = digits / sample.len() as f64;
        assert!(share > 0.22 && share < 0.34, "digit share {}", share);
    }

    #[test]
    fn failed_load_sets_error() {
        let mut store = ReportsStore::new();
        store.begin_load();
        store.finish_load(Err(Error::MissingToken));
        assert!(!store.state().loading);
        assert_eq!(
            store.state().error.as_deref(),
            Some("Error al cargar los reportes")
        );
    }

    #[test]
    fn change_status_records_history() {
        let mut store = loaded(&["r-1", "r-2"]);
        store.change_status("r-1", ReportStatus::InProgress, "crew on site", "ana", 40, vec![]);
        let report = &store.state().reports[0];
        assert_eq!(report.status, ReportStatus::InProgress);
        assert_eq!(report.progress, 40);
        assert_eq!(report.history.len(), 2);
        let record = &report.history[1];
        assert_eq!(record.previous_status, ReportStatus::Notified);
        assert_eq!(record.new_status, ReportStatus::InProgress);
        assert_eq!(record.author, "ana");
        assert_eq!(store.state().reports[1].history.len(), 1);
    }

    #[test]
    fn unknown_report_is_ignored() {
        let mut store = loaded(&["r-1"]);
        let before = store.state().clone();
        store.assign_manager("missing", "ana");
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn assignments() {
        let mut store = loaded(&["r-1"]);
        store.assign_manager("r-1", "ana");
        store.assign_center("r-1", "DAGMA");
        store.change_priority("r-1", Priority::Urgent);
        let report = &store.state().reports[0];
        assert_eq!(report.manager.as_deref(), Some("ana"));
        assert_eq!(report.managing_center.as_deref(), Some("DAGMA"));
        assert_eq!(report.priority, Priority::Urgent);
    }

    #[test]
    fn grouping_and_statistics() {
        let mut store = loaded(&["r-1", "r-2", "r-3"]);
        store.change_status("r-1", ReportStatus::Closed, "done", "ana", 100, vec![]);
        store.change_status("r-2", ReportStatus::InProgress, "started", "ana", 50, vec![]);
        store.change_priority("r-3", Priority::High);

        let state = store.state();
        let grouped = state.by_status();
        assert_eq!(grouped.len(), 7);
        assert_eq!(grouped[&ReportStatus::Closed].len(), 1);
        assert_eq!(grouped[&ReportStatus::Notified].len(), 1);
        assert_eq!(state.active().len(), 2);

        let stats = state.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status[&ReportStatus::InProgress], 1);
        assert_eq!(stats.by_priority[&Priority::Medium], 2);
        assert_eq!(stats.by_priority[&Priority::High], 1);
        assert_eq!(stats.average_progress, 50);
    }

    #[test]
    fn reset_clears_reports() {
        let mut store = loaded(&["r-1"]);
        store.reset();
        assert!(store.state().reports.is_empty());
    }

    #[test]
    fn colors() {
        assert_eq!(ReportStatus::Assigned.color(), "#8b5cf6");
        assert_eq!(ReportStatus::Closed.color(), FALLBACK_COLOR);
        assert_eq!(Priority::Urgent.color(), "#dc2626");
    }
}
