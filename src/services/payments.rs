use chrono::Utc;
use log::info;
use serde_json::json;

use super::access::{authenticate, authorize_organizer};
use super::notifier::{NewNotification, Notifier};
use crate::database::{self, audit, registrations, tournaments, DbPool};
use crate::domain::{NotificationKind, PaymentStatus, Registration};
use crate::errors::{EngineError, EngineResult};

#[derive(Clone)]
pub struct PaymentService {
    pool: DbPool,
    notifier: Notifier,
}

impl PaymentService {
    pub fn new(pool: DbPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Approves or rejects a registration's entry payment and tells the
    /// registrant.
    pub fn verify(
        &self,
        registration_id: &str,
        caller_id: Option<&str>,
        approved: bool,
        notes: Option<&str>,
    ) -> EngineResult<Registration> {
        let caller_id = authenticate(caller_id)?;
        let status = if approved {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Rejected
        };

        let mut conn = database::get_connection(&self.pool)?;
        let (updated, notification) = database::with_write_tx(&mut conn, |tx| {
            let now = Utc::now();
            let registration = registrations::find_by_id(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("registration", registration_id))?;
            let tournament = tournaments::find_by_id(tx, &registration.tournament_id)?
                .ok_or_else(|| {
                    EngineError::not_found("tournament", registration.tournament_id.as_str())
                })?;
            let actor = authorize_organizer(tx, &tournament, caller_id)?;

            registrations::update_payment_status(
                tx,
                &registration.id,
                status,
                &actor.id,
                notes,
                now,
            )?;

            let (kind, title, message) = if approved {
                (
                    NotificationKind::PaymentApproved,
                    "Payment Approved",
                    format!("Your payment for \"{}\" has been approved.", tournament.title),
                )
            } else {
                let mut message =
                    format!("Your payment for \"{}\" has been rejected.", tournament.title);
                if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
                    message.push(' ');
                    message.push_str(notes);
                }
                (NotificationKind::PaymentRejected, "Payment Rejected", message)
            };
            let notification = Notifier::record(
                tx,
                NewNotification {
                    user_id: registration.user_id.clone(),
                    title: title.to_string(),
                    message,
                    kind,
                    data: json!({
                        "tournamentId": tournament.id,
                        "registrationId": registration.id,
                    }),
                },
                now,
            )?;

            let entry = actor.audit(
                "payment_verified",
                "registration",
                &registration.id,
                Some(json!({ "paymentStatus": registration.payment_status })),
                Some(json!({ "paymentStatus": status, "notes": notes })),
                now,
            );
            audit::insert_entry(tx, &entry)?;

            let updated = registrations::find_by_id(tx, &registration.id)?
                .ok_or_else(|| EngineError::not_found("registration", registration.id.as_str()))?;
            Ok((updated, notification))
        })?;

        self.notifier.push(&conn, &notification);
        info!("Registration {} marked {} by {}", updated.id, status, caller_id);
        Ok(updated)
    }
}
