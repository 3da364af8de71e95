// libs/document-permission-cell/src/services/grant.rs
use chrono::NaiveDateTime;
use tracing::warn;

use crate::models::{
    CreatePermissionRequest, DocumentAccess, DocumentAccessView, PermissionError,
    PermissionGroups, PermissionRequest, PermissionStatus, PermissionView,
};

/// Approved grants expire this long after the patient answers. The backend
/// stamps `expiresAt`.
pub const GRANT_DURATION_HOURS: i64 = 12;

pub const MAX_REQUEST_MESSAGE_LEN: usize = 500;

/// Time-boxed access rules. `now` is the local wall-clock time.
#[derive(Debug, Clone, Default)]
pub struct PermissionGrantService;

impl PermissionGrantService {
    pub fn new() -> Self {
        Self
    }

    pub fn is_access_valid(&self, request: &PermissionRequest, now: NaiveDateTime) -> bool {
        request.status == PermissionStatus::Approved
            && !request.flagged_expired()
            && request.expires_at.is_some_and(|expires_at| now < expires_at)
    }

    /// Whole minutes left, never negative.
    pub fn minutes_remaining(&self, expires_at: NaiveDateTime, now: NaiveDateTime) -> i64 {
        (expires_at - now).num_minutes().max(0)
    }

    pub fn format_time_remaining(&self, minutes: i64) -> String {
        if minutes > 60 {
            format!("{}h {}m", minutes / 60, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    pub fn describe(&self, request: PermissionRequest, now: NaiveDateTime) -> PermissionView {
        let access_valid = self.is_access_valid(&request, now);
        let minutes_remaining = request
            .expires_at
            .filter(|_| access_valid)
            .map(|expires_at| self.minutes_remaining(expires_at, now));

        PermissionView {
            time_remaining_label: minutes_remaining.map(|minutes| self.format_time_remaining(minutes)),
            minutes_remaining,
            access_valid,
            request,
        }
    }

    /// Pending, active (valid grants) and closed (rejected, revoked or expired).
    pub fn group_requests(&self, requests: Vec<PermissionRequest>, now: NaiveDateTime) -> PermissionGroups {
        let mut groups = PermissionGroups::default();

        for request in requests {
            let view = self.describe(request, now);
            if view.request.status == PermissionStatus::Pending {
                groups.pending.push(view);
            } else if view.access_valid {
                groups.active.push(view);
            } else {
                groups.closed.push(view);
            }
        }

        groups
    }

    /// Recomputes `can_view` and the remaining time against `now`.
    pub fn refresh_access(&self, access: DocumentAccess, now: NaiveDateTime) -> DocumentAccessView {
        let still_open = access.expires_at.map_or(true, |expires_at| now < expires_at);
        let time_remaining = access
            .expires_at
            .map(|expires_at| self.minutes_remaining(expires_at, now));

        let access = DocumentAccess {
            can_view: access.can_view && still_open,
            time_remaining,
            ..access
        };

        DocumentAccessView {
            time_remaining_label: time_remaining
                .filter(|_| access.can_view)
                .map(|minutes| self.format_time_remaining(minutes)),
            access,
        }
    }

    pub fn ensure_respondable(&self, request: &PermissionRequest) -> Result<(), PermissionError> {
        if request.status != PermissionStatus::Pending {
            warn!("Permission request {} already answered ({})", request.id, request.status);
            return Err(PermissionError::NotPending(request.status));
        }
        Ok(())
    }

    pub fn ensure_revocable(&self, request: &PermissionRequest, now: NaiveDateTime) -> Result<(), PermissionError> {
        if !self.is_access_valid(request, now) {
            warn!("Permission request {} is not an active grant", request.id);
            return Err(PermissionError::NotRevocable);
        }
        Ok(())
    }

    pub fn validate_request(&self, request: &CreatePermissionRequest) -> Result<(), PermissionError> {
        if request.appointment_id.trim().is_empty() {
            return Err(PermissionError::ValidationError("Appointment is required".to_string()));
        }
        if request.document_id.trim().is_empty() {
            return Err(PermissionError::ValidationError("Document is required".to_string()));
        }
        if request
            .request_message
            .as_ref()
            .is_some_and(|message| message.chars().count() > MAX_REQUEST_MESSAGE_LEN)
        {
            return Err(PermissionError::ValidationError(format!(
                "Request message must be at most {} characters",
                MAX_REQUEST_MESSAGE_LEN
            )));
        }
        Ok(())
    }
}
