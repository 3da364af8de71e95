// libs/emergency-cell/src/services/triage.rs
use tracing::warn;

use crate::models::{
    CreateEmergencyRequest, EmergencyCounts, EmergencyError, EmergencyRequest, EmergencyStatus,
    EmergencyTab,
};

pub const MAX_SYMPTOMS_LEN: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct EmergencyTriageService;

impl EmergencyTriageService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_request(&self, request: &CreateEmergencyRequest) -> Result<(), EmergencyError> {
        if request.symptoms.trim().is_empty() {
            return Err(EmergencyError::ValidationError("Symptoms are required".to_string()));
        }
        if request.symptoms.chars().count() > MAX_SYMPTOMS_LEN {
            return Err(EmergencyError::ValidationError(format!(
                "Symptoms must be at most {} characters",
                MAX_SYMPTOMS_LEN
            )));
        }
        if request.location.trim().is_empty() {
            return Err(EmergencyError::ValidationError("Location is required".to_string()));
        }
        Ok(())
    }

    pub fn in_tab(&self, request: &EmergencyRequest, tab: EmergencyTab) -> bool {
        match tab {
            EmergencyTab::Active => matches!(
                request.status,
                EmergencyStatus::Pending | EmergencyStatus::Accepted
            ),
            EmergencyTab::Completed => request.status == EmergencyStatus::Completed,
            EmergencyTab::Rejected => request.status == EmergencyStatus::Rejected,
        }
    }

    pub fn filter_tab(&self, requests: Vec<EmergencyRequest>, tab: EmergencyTab) -> Vec<EmergencyRequest> {
        requests
            .into_iter()
            .filter(|request| self.in_tab(request, tab))
            .collect()
    }

    pub fn count_tabs(&self, requests: &[EmergencyRequest]) -> EmergencyCounts {
        let count = |tab| requests.iter().filter(|r| self.in_tab(r, tab)).count();
        EmergencyCounts {
            active: count(EmergencyTab::Active),
            completed: count(EmergencyTab::Completed),
            rejected: count(EmergencyTab::Rejected),
        }
    }

    pub fn get_valid_transitions(&self, from: EmergencyStatus) -> Vec<EmergencyStatus> {
        match from {
            EmergencyStatus::Pending => vec![EmergencyStatus::Accepted, EmergencyStatus::Rejected],
            EmergencyStatus::Accepted => vec![EmergencyStatus::Completed],
            _ => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        from: EmergencyStatus,
        to: EmergencyStatus,
    ) -> Result<(), EmergencyError> {
        if !self.get_valid_transitions(from).contains(&to) {
            warn!("Invalid emergency transition {} -> {}", from, to);
            return Err(EmergencyError::InvalidStatusTransition { from, to });
        }
        Ok(())
    }

    pub fn ensure_cancellable(&self, request: &EmergencyRequest) -> Result<(), EmergencyError> {
        if request.status != EmergencyStatus::Pending {
            return Err(EmergencyError::NotCancellable(request.status));
        }
        Ok(())
    }

    /// Most urgent first, then oldest first.
    pub fn sort_for_triage(&self, requests: &mut [EmergencyRequest]) {
        requests.sort_by(|a, b| {
            a.urgency_level
                .cmp(&b.urgency_level)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
    }
}
