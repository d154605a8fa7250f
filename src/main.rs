use std::collections::BTreeMap;

use enrollment_form::cep_client::ViaCepClient;
use enrollment_form::config::Config;
use enrollment_form::controller::EnrollmentForm;
use enrollment_form::models::{FieldKey, Role};
use enrollment_form::render;
use enrollment_form::submission::{submit_enrollment, SubmitOutcome};
use enrollment_form::submission_client::SubmissionClient;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Raw values as a user would have typed them, keyed by field.
#[derive(Debug, Deserialize)]
struct FormInput {
    applicant: BTreeMap<FieldKey, String>,
    #[serde(default)]
    guardian: BTreeMap<FieldKey, String>,
}

fn apply_values(form: &mut EnrollmentForm, role: Role, values: &BTreeMap<FieldKey, String>) {
    for (key, value) in values {
        if *key == FieldKey::PostalCode {
            continue;
        }
        form.set_value(role, *key, value);
    }
}

/// Replays a CEP input + blur, then restores values the user typed into
/// fields the lookup left editable.
async fn fill_address(
    form: &mut EnrollmentForm,
    role: Role,
    values: &BTreeMap<FieldKey, String>,
    lookup: &ViaCepClient,
) {
    let Some(cep) = values.get(&FieldKey::PostalCode) else {
        return;
    };

    form.on_postal_code_input(role, cep);
    form.lookup_postal_code(role, lookup).await;

    for key in [
        FieldKey::Street,
        FieldKey::Number,
        FieldKey::Complement,
        FieldKey::Neighborhood,
        FieldKey::City,
        FieldKey::Region,
    ] {
        let editable = !form.person(role).field(key).disabled;
        if let Some(value) = values.get(&key).filter(|v| editable && !v.is_empty()) {
            form.set_value(role, key, value);
        }
    }
}

/// Main entry point.
///
/// Loads a form document, replays the page events against it (birth date,
/// CEP lookups, field checks), submits it and prints the resulting view.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enrollment_form=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: enrollment-form <form.json>"))?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
    let input: FormInput = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid form document {}: {}", path, e))?;

    let lookup = ViaCepClient::from_config(&config).map_err(|e| anyhow::anyhow!(e))?;
    let sink = SubmissionClient::from_config(&config).map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("✓ Clients initialized (submit: {})", sink.endpoint());

    let mut form = EnrollmentForm::new();

    apply_values(&mut form, Role::Applicant, &input.applicant);
    form.on_birth_date_change(chrono::Local::now().date_naive());
    fill_address(&mut form, Role::Applicant, &input.applicant, &lookup).await;

    let mut roles = vec![Role::Applicant];
    if form.guardian_visible {
        apply_values(&mut form, Role::Guardian, &input.guardian);
        fill_address(&mut form, Role::Guardian, &input.guardian, &lookup).await;
        roles.push(Role::Guardian);
    } else if !input.guardian.is_empty() {
        tracing::warn!("Applicant is not a minor; guardian data ignored");
    }

    for role in roles {
        form.on_identifier_blur(role);
        let email = form.person(role).email.value.clone();
        form.on_email_input(role, &email);
        let phone = form.person(role).phone.value.clone();
        form.on_phone_input(role, &phone);
    }

    let outcome = submit_enrollment(&mut form, &sink, &config.redirect_policy()).await;

    println!("{}", serde_json::to_string_pretty(&render::project(&form))?);

    match outcome {
        SubmitOutcome::Blocked(violations) => {
            for violation in &violations {
                tracing::warn!("Invalid field: {}", violation.field_name());
            }
        }
        SubmitOutcome::Accepted { redirect, .. } => {
            if let Some(redirect) = redirect {
                tracing::info!("Redirecting to {} in {:?}", redirect.url, redirect.after);
                redirect.wait().await;
                println!("{}", redirect.url);
            }
        }
        SubmitOutcome::Rejected { status, .. } => {
            tracing::warn!("Backend rejected the enrollment ({})", status);
        }
        SubmitOutcome::Failed { connection } => {
            tracing::error!("Submission failed (connection: {})", connection);
        }
    }

    for notice in form.take_notices() {
        tracing::info!("{}", notice);
    }

    Ok(())
}
