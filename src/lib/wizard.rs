use super::error::{Error, Result};
use super::items::{ReportDraft, VerificationDraft};
use std::collections::BTreeSet;
use tracing::debug;

const RECOGNITION_STEPS: [&str; 3] = [
    "Selección de Parque",
    "Datos y GPS",
    "Evidencia Fotográfica",
];

const VERIFICATION_STEPS: [&str; 5] = [
    "Tipo de Visita",
    "Selección de Unidad",
    "Validación de Datos",
    "Captura en Sitio",
    "Estado 360 y Evidencia",
];

/// The two capture flows. Recognition numbers its steps from 1, verification
/// from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Recognition,
    Verification,
}

impl Flow {
    pub fn first_step(self) -> u8 {
        match self {
            Flow::Recognition => 1,
            Flow::Verification => 0,
        }
    }

    pub fn last_step(self) -> u8 {
        match self {
            Flow::Recognition => 3,
            Flow::Verification => 4,
        }
    }

    pub fn step_count(self) -> usize {
        self.step_names().len()
    }

    pub fn step_names(self) -> &'static [&'static str] {
        match self {
            Flow::Recognition => &RECOGNITION_STEPS,
            Flow::Verification => &VERIFICATION_STEPS,
        }
    }

    pub fn step_name(self, step: u8) -> Option<&'static str> {
        let index = step.checked_sub(self.first_step())?;
        self.step_names().get(index as usize).copied()
    }

    pub fn contains(self, step: u8) -> bool {
        step >= self.first_step() && step <= self.last_step()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wizard {
    flow: Flow,
    current: u8,
    completed: BTreeSet<u8>,
}

impl Wizard {
    pub fn new(flow: Flow) -> Self {
        Wizard {
            flow,
            current: flow.first_step(),
            completed: BTreeSet::new(),
        }
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn completed(&self) -> &BTreeSet<u8> {
        &self.completed
    }

    pub fn is_completed(&self, step: u8) -> bool {
        self.completed.contains(&step)
    }

    pub fn is_first(&self) -> bool {
        self.current == self.flow.first_step()
    }

    pub fn is_last(&self) -> bool {
        self.current == self.flow.last_step()
    }

    /// Marks the current step as completed and moves forward. On the last
    /// step only the completion mark changes.
    pub fn next(&mut self) {
        self.completed.insert(self.current);
        self.current = (self.current + 1).min(self.flow.last_step());
        debug!(step = self.current, completed = ?self.completed, "wizard advanced");
    }

    /// Moves back one step. Completion marks are kept.
    pub fn previous(&mut self) {
        self.current = self
            .current
            .saturating_sub(1)
            .max(self.flow.first_step());
    }

    pub fn go_to(&mut self, step: u8) -> Result<()> {
        if !self.flow.contains(step) {
            return Err(Error::StepOutOfRange {
                step,
                first: self.flow.first_step(),
                last: self.flow.last_step(),
            });
        }
        self.current = step;
        Ok(())
    }

    /// Share of completed steps, from 0 to 100.
    pub fn progress(&self) -> f64 {
        self.completed.len() as f64 / self.flow.step_count() as f64 * 100.
    }
}

/// Whether a draft holds everything a step requires. Never mutates.
pub trait StepValidation {
    fn is_step_valid(&self, step: u8) -> bool;
}

fn is_filled(field: &Option<String>) -> bool {
    field.as_ref().map_or(false, |value| !value.trim().is_empty())
}

impl StepValidation for ReportDraft {
    fn is_step_valid(&self, step: u8) -> bool {
        match step {
            1 => self.upid.is_some(),
            2 => {
                is_filled(&self.intervention_type)
                    && is_filled(&self.intervention_description)
                    && self.gps.is_some()
            }
            // photos are optional
            3 => true,
            _ => false,
        }
    }
}

impl StepValidation for VerificationDraft {
    fn is_step_valid(&self, step: u8) -> bool {
        match step {
            0 => self.visit_type.is_some(),
            1 => self.upid.is_some(),
            2 => self
                .validation
                .as_ref()
                .map_or(false, |v| v.is_correct || is_filled(&v.comment)),
            3 => {
                self.gps.is_some()
                    && is_filled(&self.intervention_description)
                    && is_filled(&self.request_description)
            }
            4 => self.stage_360.is_some(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::Coordinates;
    use crate::items::{DataValidation, Stage360, UnitId, VisitType};

    #[test]
    fn initial_state() {
        let wizard = Wizard::new(Flow::Recognition);
        assert_eq!(wizard.current(), 1);
        assert!(wizard.completed().is_empty());
        assert!(wizard.is_first());

        let wizard = Wizard::new(Flow::Verification);
        assert_eq!(wizard.current(), 0);
    }

    #[test]
    fn next_marks_completion() {
        let mut wizard = Wizard::new(Flow::Recognition);
        wizard.next();
        assert_eq!(wizard.current(), 2);
        assert!(wizard.is_completed(1));
        assert!(!wizard.is_completed(2));
    }

    #[test]
    fn next_on_last_step_stays_and_completes() {
        let mut wizard = Wizard::new(Flow::Recognition);
        wizard.go_to(3).unwrap();
        wizard.next();
        assert_eq!(wizard.current(), 3);
        assert!(wizard.is_completed(3));
        assert!(wizard.is_last());
    }

    #[test]
    fn previous_on_first_step_stays() {
        let mut wizard = Wizard::new(Flow::Recognition);
        wizard.previous();
        assert_eq!(wizard.current(), 1);

        let mut wizard = Wizard::new(Flow::Verification);
        wizard.previous();
        assert_eq!(wizard.current(), 0);
    }

    #[test]
    fn previous_keeps_completion() {
        let mut wizard = Wizard::new(Flow::Verification);
        wizard.next();
        wizard.next();
        wizard.previous();
        assert_eq!(wizard.current(), 1);
        assert!(wizard.is_completed(0));
        assert!(wizard.is_completed(1));
    }

    #[test]
    fn go_to_has_no_completion_side_effect() {
        let mut wizard = Wizard::new(Flow::Verification);
        wizard.go_to(4).unwrap();
        assert_eq!(wizard.current(), 4);
        assert!(wizard.completed().is_empty());
    }

    #[test]
    fn go_to_outside_of_flow() {
        let mut wizard = Wizard::new(Flow::Recognition);
        assert!(wizard.go_to(0).is_err());
        assert!(wizard.go_to(4).is_err());
        assert_eq!(wizard.current(), 1);
    }

    #[test]
    fn progress() {
        let mut wizard = Wizard::new(Flow::Recognition);
        assert_eq!(wizard.progress(), 0.);
        wizard.next();
        wizard.next();
        wizard.next();
        assert_eq!(wizard.progress(), 100.);
    }

    #[test]
    fn step_names() {
        assert_eq!(Flow::Recognition.step_count(), 3);
        assert_eq!(Flow::Verification.step_count(), 5);
        assert_eq!(Flow::Recognition.step_name(1), Some("Selección de Parque"));
        assert_eq!(Flow::Recognition.step_name(0), None);
        assert_eq!(Flow::Verification.step_name(0), Some("Tipo de Visita"));
    }

    #[test]
    fn recognition_capture_step_requires_gps() {
        let mut draft = ReportDraft {
            intervention_type: Some("Poda".into()),
            intervention_description: Some("Poda de árboles".into()),
            ..Default::default()
        };
        assert!(!draft.is_step_valid(2));
        assert!(!draft.is_step_valid(2));
        draft.gps = Some(Coordinates::new(3.45, -76.53));
        assert!(draft.is_step_valid(2));
        assert!(draft.is_step_valid(2));
    }

    #[test]
    fn recognition_blank_description_is_missing() {
        let draft = ReportDraft {
            intervention_type: Some("Poda".into()),
            intervention_description: Some("   ".into()),
            gps: Some(Coordinates::new(3.45, -76.53)),
            ..Default::default()
        };
        assert!(!draft.is_step_valid(2));
    }

    #[test]
    fn recognition_selection_and_photos() {
        let mut draft = ReportDraft::default();
        assert!(!draft.is_step_valid(1));
        draft.upid = Some(UnitId::Number(7));
        assert!(draft.is_step_valid(1));
        assert!(draft.is_step_valid(3));
        assert!(!draft.is_step_valid(4));
    }

    #[test]
    fn verification_steps() {
        let mut draft = VerificationDraft::default();
        assert!(!draft.is_step_valid(0));
        draft.visit_type = Some(VisitType::Comunicaciones);
        assert!(draft.is_step_valid(0));

        draft.validation = Some(DataValidation {
            is_correct: false,
            comment: None,
        });
        assert!(!draft.is_step_valid(2));
        draft.validation = Some(DataValidation {
            is_correct: false,
            comment: Some("nombre errado".into()),
        });
        assert!(draft.is_step_valid(2));

        draft.gps = Some(Coordinates::new(3.45, -76.53));
        draft.intervention_description = Some("Cancha".into());
        assert!(!draft.is_step_valid(3));
        draft.request_description = Some("Iluminación".into());
        assert!(draft.is_step_valid(3));

        assert!(!draft.is_step_valid(4));
        draft.stage_360 = Some(Stage360::Durante);
        assert!(draft.is_step_valid(4));
    }
}
