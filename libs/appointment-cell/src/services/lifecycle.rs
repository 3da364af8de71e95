// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{
    Appointment, AppointmentActions, AppointmentError, AppointmentStatus, AppointmentView,
    BadgeTone, StatusBadge, TimeSlot,
};

/// Limits applied to patient-initiated changes.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleRules {
    pub max_reschedule_count: u32,
    pub min_reschedule_notice_hours: i64,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            max_reschedule_count: 1,
            min_reschedule_notice_hours: 2,
        }
    }
}

/// Appointment rules. Every check takes the caller's role and the current
/// local wall-clock time explicitly, so results depend only on the inputs.
#[derive(Debug, Clone, Default)]
pub struct AppointmentLifecycleService {
    rules: LifecycleRules,
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: LifecycleRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> LifecycleRules {
        self.rules
    }

    /// Whole hours between `now` and `start`, truncated toward zero.
    pub fn hours_until(&self, start: NaiveDateTime, now: NaiveDateTime) -> i64 {
        (start - now).num_hours()
    }

    pub fn is_upcoming(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        appointment.starts_at() >= now
    }

    pub fn can_reschedule(&self, appointment: &Appointment, role: Role, now: NaiveDateTime) -> bool {
        self.reschedule_blocker(appointment, role, now).is_none()
    }

    /// Reason a reschedule is refused, if any.
    pub fn reschedule_blocker(
        &self,
        appointment: &Appointment,
        role: Role,
        now: NaiveDateTime,
    ) -> Option<String> {
        if role != Role::Patient {
            return Some("only the patient can reschedule".to_string());
        }
        if appointment.status != AppointmentStatus::Approved {
            return Some(format!("status is {}", appointment.status));
        }
        if appointment.reschedule_count >= self.rules.max_reschedule_count {
            return Some("reschedule limit reached".to_string());
        }
        if self.hours_until(appointment.starts_at(), now) < self.rules.min_reschedule_notice_hours {
            return Some(format!(
                "less than {} hours before the start",
                self.rules.min_reschedule_notice_hours
            ));
        }
        None
    }

    pub fn can_cancel(&self, appointment: &Appointment, role: Role, now: NaiveDateTime) -> bool {
        self.cancel_blocker(appointment, role, now).is_none()
    }

    pub fn cancel_blocker(
        &self,
        appointment: &Appointment,
        role: Role,
        now: NaiveDateTime,
    ) -> Option<String> {
        if role != Role::Patient {
            return Some("only the patient can cancel".to_string());
        }
        if appointment.status != AppointmentStatus::Pending {
            return Some(format!("status is {}", appointment.status));
        }
        if !self.is_upcoming(appointment, now) {
            return Some("appointment already started".to_string());
        }
        None
    }

    /// Approve and reject share the same precondition.
    pub fn can_decide(&self, appointment: &Appointment, role: Role) -> bool {
        role == Role::Doctor && appointment.status == AppointmentStatus::Pending
    }

    pub fn can_complete(&self, appointment: &Appointment, role: Role) -> bool {
        role == Role::Doctor && appointment.status == AppointmentStatus::Approved
    }

    pub fn status_badge(&self, status: AppointmentStatus) -> StatusBadge {
        match status {
            AppointmentStatus::Approved => StatusBadge {
                label: "Approved",
                tone: BadgeTone::Positive,
            },
            AppointmentStatus::Rejected => StatusBadge {
                label: "Rejected",
                tone: BadgeTone::Negative,
            },
            // Completed and unknown statuses render like pending
            _ => StatusBadge {
                label: "Pending",
                tone: BadgeTone::Secondary,
            },
        }
    }

    pub fn is_slot_bookable(
        &self,
        slot: &TimeSlot,
        selected_date: NaiveDate,
        now: NaiveDateTime,
    ) -> bool {
        selected_date != now.date() || slot.time_from > now.time()
    }

    /// Drops slots that already started when `selected_date` is today.
    pub fn filter_bookable_slots(
        &self,
        slots: Vec<TimeSlot>,
        selected_date: NaiveDate,
        now: NaiveDateTime,
    ) -> Vec<TimeSlot> {
        let before = slots.len();
        let bookable: Vec<TimeSlot> = slots
            .into_iter()
            .filter(|slot| self.is_slot_bookable(slot, selected_date, now))
            .collect();

        debug!("{} of {} slots bookable on {}", bookable.len(), before, selected_date);
        bookable
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Approved, AppointmentStatus::Rejected],
            AppointmentStatus::Approved => vec![AppointmentStatus::Completed],
            AppointmentStatus::Rejected | AppointmentStatus::Completed | AppointmentStatus::Unknown => {
                vec![]
            }
        }
    }

    /// Splits into (upcoming, past). Upcoming is soonest first, past is most
    /// recent first.
    pub fn partition_by_time(
        &self,
        appointments: Vec<Appointment>,
        now: NaiveDateTime,
    ) -> (Vec<Appointment>, Vec<Appointment>) {
        let (mut upcoming, mut past): (Vec<_>, Vec<_>) = appointments
            .into_iter()
            .partition(|appointment| self.is_upcoming(appointment, now));

        upcoming.sort_by_key(|appointment| appointment.starts_at());
        past.sort_by_key(|appointment| std::cmp::Reverse(appointment.starts_at()));

        (upcoming, past)
    }

    /// Earliest upcoming appointment that is still going ahead.
    pub fn next_appointment<'a>(
        &self,
        appointments: &'a [Appointment],
        now: NaiveDateTime,
    ) -> Option<&'a Appointment> {
        appointments
            .iter()
            .filter(|appointment| {
                self.is_upcoming(appointment, now)
                    && matches!(
                        appointment.status,
                        AppointmentStatus::Pending | AppointmentStatus::Approved
                    )
            })
            .min_by_key(|appointment| appointment.starts_at())
    }

    /// A doctor's schedule only lists confirmed visits.
    pub fn doctor_schedule(&self, appointments: Vec<Appointment>) -> Vec<Appointment> {
        appointments
            .into_iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Approved)
            .collect()
    }

    pub fn available_actions(
        &self,
        appointment: &Appointment,
        role: Role,
        now: NaiveDateTime,
    ) -> AppointmentActions {
        let decide = self.can_decide(appointment, role);

        AppointmentActions {
            reschedule: self.can_reschedule(appointment, role, now),
            cancel: self.can_cancel(appointment, role, now),
            approve: decide,
            reject: decide,
            complete: self.can_complete(appointment, role),
        }
    }

    pub fn describe(&self, appointment: Appointment, role: Role, now: NaiveDateTime) -> AppointmentView {
        AppointmentView {
            badge: self.status_badge(appointment.status),
            upcoming: self.is_upcoming(&appointment, now),
            actions: self.available_actions(&appointment, role, now),
            appointment,
        }
    }
}
