/// Submission workflow
///
/// 1. Evaluate every (field, rule) pair for the applicant, and for the guardian
///    when the section is visible, collecting violations
/// 2. Build the flat JSON payload
/// 3. POST it through a `SubmissionSink`
/// 4. Turn the outcome into a notice, resetting the form on success
use crate::controller::{validate_field, EnrollmentForm};
use crate::errors::AppError;
use crate::models::{FieldKey, Notice, Role, Violation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Flat key/value record sent to the backend.
pub type FormPayload = Map<String, Value>;

/// Receives a validated enrollment.
///
/// On success returns the optional user-facing message from the server.
#[allow(async_fn_in_trait)]
pub trait SubmissionSink {
    async fn submit(&self, payload: &FormPayload) -> Result<Option<String>, AppError>;
}

/// Where to send the user after a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub url: Option<String>,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub url: String,
    pub after: Duration,
}

impl Redirect {
    /// Waits out the redirect delay.
    pub async fn wait(&self) {
        tokio::time::sleep(self.after).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Blocked(Vec<Violation>),
    Accepted {
        message: Option<String>,
        redirect: Option<Redirect>,
    },
    /// The endpoint answered with a non-success status.
    Rejected {
        status: u16,
        message: Option<String>,
    },
    /// No usable response was received.
    Failed { connection: bool },
}

fn roles_in_scope(form: &EnrollmentForm) -> Vec<Role> {
    if form.guardian_visible {
        vec![Role::Applicant, Role::Guardian]
    } else {
        vec![Role::Applicant]
    }
}

/// Runs every field check and returns the failures.
///
/// All fields are evaluated even after the first failure so every marker
/// reflects the current values.
pub fn validate_form(form: &mut EnrollmentForm) -> Vec<Violation> {
    let mut violations = Vec::new();

    for role in roles_in_scope(form) {
        let person = form.person_mut(role);
        for key in FieldKey::ALL {
            let rule = key.rule();
            if !validate_field(person.field_mut(key), rule) {
                violations.push(Violation { role, key, rule });
            }
        }
    }

    if !violations.is_empty() {
        tracing::debug!(
            "Form has {} invalid field(s): {:?}",
            violations.len(),
            violations.iter().map(Violation::field_name).collect::<Vec<_>>()
        );
    }

    violations
}

/// Builds the flat record sent to the backend.
///
/// Guardian keys are only present while the guardian section is visible.
pub fn build_payload(form: &EnrollmentForm) -> FormPayload {
    let mut payload = Map::new();

    for role in roles_in_scope(form) {
        let person = form.person(role);
        for key in FieldKey::ALL {
            payload.insert(
                format!("{}{}", role.prefix(), key.wire_name()),
                Value::String(person.field(key).value.clone()),
            );
        }
    }

    payload
}

/// Validates and submits the form.
pub async fn submit_enrollment<S: SubmissionSink>(
    form: &mut EnrollmentForm,
    sink: &S,
    redirect: &RedirectPolicy,
) -> SubmitOutcome {
    let violations = validate_form(form);
    form.was_validated = true;

    if !violations.is_empty() {
        tracing::warn!("Submission blocked: {} field(s) invalid", violations.len());
        return SubmitOutcome::Blocked(violations);
    }

    let payload = build_payload(form);
    tracing::info!(
        "Submitting enrollment ({} fields, guardian: {})",
        payload.len(),
        form.guardian_visible
    );

    match sink.submit(&payload).await {
        Ok(message) => {
            form.push_notice(Notice::SubmissionAccepted(message.clone()));
            form.reset();

            let redirect = redirect.url.as_ref().map(|url| Redirect {
                url: url.clone(),
                after: redirect.delay,
            });

            tracing::info!("✓ Enrollment submitted");
            SubmitOutcome::Accepted { message, redirect }
        }
        Err(e) => match e.root().clone() {
            AppError::SubmissionRejected { status, message } => {
                tracing::warn!("Enrollment rejected with status {}", status);
                form.push_notice(Notice::SubmissionRejected(message.clone()));
                SubmitOutcome::Rejected { status, message }
            }
            other => {
                let connection = other.is_connection_failure();
                tracing::error!("Enrollment submission failed: {}", e);
                form.push_notice(if connection {
                    Notice::ConnectionFailed
                } else {
                    Notice::UnexpectedError
                });
                SubmitOutcome::Failed { connection }
            }
        },
    }
}
