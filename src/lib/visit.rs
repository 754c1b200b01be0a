//! State of the park recognition form: the wizard position, the draft being
//! filled and the park catalogue it picks from.

use super::client::ApiClient;
use super::error::{Error, Result};
use super::gps::{self, PositionOptions, PositionSource};
use super::items::{Photo, ProjectUnit, ReportDraft, ReportPatch};
use super::store::{Store, SubscriptionId};
use super::wizard::{Flow, StepValidation, Wizard};
use tracing::error;

const PARKS_LOAD_ERROR: &str = "No se pudieron cargar los parques";

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub wizard: Wizard,
    pub draft: ReportDraft,
    pub is_loading: bool,
    pub error: Option<String>,
    pub parks: Vec<ProjectUnit>,
    pub selected_park: Option<ProjectUnit>,
}

impl FormState {
    pub fn new() -> Self {
        FormState {
            wizard: Wizard::new(Flow::Recognition),
            draft: ReportDraft::new(),
            is_loading: false,
            error: None,
            parks: vec![],
            selected_park: None,
        }
    }

    pub fn progress(&self) -> f64 {
        self.wizard.progress()
    }

    pub fn is_current_step_valid(&self) -> bool {
        self.draft.is_step_valid(self.wizard.current())
    }
}

impl Default for FormState {
    fn default() -> Self {
        FormState::new()
    }
}

#[derive(Debug)]
pub struct VisitStore {
    store: Store<FormState>,
}

impl Default for VisitStore {
    fn default() -> Self {
        VisitStore {
            store: Store::new(FormState::new()),
        }
    }
}

impl VisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState {
        self.store.get()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&FormState) + 'static,
    {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Back to step one with an empty draft stamped now.
    pub fn reset(&mut self) {
        self.store.set(FormState::new());
    }

    pub fn next_step(&mut self) {
        self.store.update(|state| {
            let mut wizard = state.wizard.clone();
            wizard.next();
            FormState {
                wizard,
                ..state.clone()
            }
        });
    }

    pub fn previous_step(&mut self) {
        self.store.update(|state| {
            let mut wizard = state.wizard.clone();
            wizard.previous();
            FormState {
                wizard,
                ..state.clone()
            }
        });
    }

    /// Leaves the state untouched when `step` is not part of the flow.
    pub fn go_to_step(&mut self, step: u8) -> Result<()> {
        let mut wizard = self.state().wizard.clone();
        wizard.go_to(step)?;
        self.store.update(|state| FormState {
            wizard,
            ..state.clone()
        });
        Ok(())
    }

    pub fn update_data(&mut self, patch: ReportPatch) {
        self.store.update(|state| FormState {
            draft: patch.apply(&state.draft),
            ..state.clone()
        });
    }

    pub fn select_park(&mut self, park: ProjectUnit) {
        self.store.update(|state| FormState {
            draft: ReportDraft {
                upid: Some(park.upid.clone()),
                park_name: Some(park.name.clone()),
                address: Some(park.address.clone().unwrap_or_default()),
                ..state.draft.clone()
            },
            selected_park: Some(park),
            ..state.clone()
        });
    }

    /// Reads a fix from `source` and stores it as a `Point` with
    /// `[lon, lat]` coordinate data, or keeps the error message.
    pub fn capture_gps(&mut self, source: &dyn PositionSource) {
        self.set_busy();
        let result = gps::acquire(source, &PositionOptions::default());
        self.store.update(|state| match result {
            Ok(coordinates) => {
                let data = format!("[{},{}]", coordinates.longitude, coordinates.latitude);
                FormState {
                    is_loading: false,
                    draft: ReportDraft {
                        gps: Some(coordinates),
                        coordinates_type: Some("Point".into()),
                        coordinates_data: Some(data),
                        ..state.draft.clone()
                    },
                    ..state.clone()
                }
            }
            Err(err) => FormState {
                is_loading: false,
                error: Some(err.to_string()),
                ..state.clone()
            },
        });
    }

    pub fn add_photos(&mut self, photos: Vec<Photo>) {
        self.store.update(|state| {
            let mut draft = state.draft.clone();
            draft.photos.extend(photos);
            FormState {
                draft,
                ..state.clone()
            }
        });
    }

    /// Out of range indexes are ignored.
    pub fn remove_photo(&mut self, index: usize) {
        self.store.update(|state| {
            let mut draft = state.draft.clone();
            if index < draft.photos.len() {
                draft.photos.remove(index);
            }
            FormState {
                draft,
                ..state.clone()
            }
        });
    }

    fn set_busy(&mut self) {
        self.store.update(|state| FormState {
            is_loading: true,
            error: None,
            ..state.clone()
        });
    }

    pub fn begin_load(&mut self) {
        self.set_busy();
    }

    pub fn finish_load_parks(&mut self, result: Result<Vec<ProjectUnit>>) {
        match result {
            Ok(parks) => self.store.update(|state| FormState {
                is_loading: false,
                parks,
                ..state.clone()
            }),
            Err(err) => {
                error!(error = %err, "could not load parks");
                self.store.update(|state| FormState {
                    is_loading: false,
                    error: Some(PARKS_LOAD_ERROR.into()),
                    ..state.clone()
                });
            }
        }
    }

    pub async fn load_parks(&mut self, client: &ApiClient) {
        self.begin_load();
        let result = client.parks().await;
        self.finish_load_parks(result);
    }

    /// Selects the loaded park whose upid reads as `upid`. A failed catalogue
    /// load is reported before the lookup.
    pub fn select_park_by_upid(&mut self, upid: &str) -> Result<()> {
        if let Some(message) = &self.state().error {
            return Err(Error::ParksUnavailable(message.clone()));
        }
        let park = self
            .state()
            .parks
            .iter()
            .find(|park| park.upid.to_string() == upid)
            .cloned()
            .ok_or_else(|| Error::UnknownPark(upid.into()))?;
        self.select_park(park);
        Ok(())
    }

    pub fn set_parks(&mut self, parks: Vec<ProjectUnit>) {
        self.store.update(|state| FormState {
            parks,
            ..state.clone()
        });
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.store.update(|state| FormState {
            error,
            ..state.clone()
        });
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.store.update(|state| FormState {
            is_loading,
            ..state.clone()
        });
    }

    pub fn progress(&self) -> f64 {
        self.state().progress()
    }

    pub fn is_current_step_valid(&self) -> bool {
        self.state().is_current_step_valid()
    }

    pub fn step_names(&self) -> &'static [&'static str] {
        self.state().wizard.flow().step_names()
    }
}
