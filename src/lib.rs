//! Enrollment Form Library
//!
//! This library provides the validation and conditional-field logic for an
//! enrollment form (applicant plus, for minors, a legal guardian), including
//! CEP address lookup via ViaCEP and submission to a backend endpoint.
//!
//! # Modules
//!
//! - `core`: Form state, rules and validators.
//! - `integrations`: External service clients (ViaCEP, submission endpoint).
//! - `age`: Calendar age and minor detection.
//! - `cache_validator`: Cache integrity checks.
//! - `cep_client`: ViaCEP lookup client.
//! - `config`: Configuration management.
//! - `controller`: Form state and event handlers.
//! - `errors`: Error handling types.
//! - `models`: Fields, person records, notices and violations.
//! - `render`: Projection of form state into a view.
//! - `submission`: Validation pass, payload and submit workflow.
//! - `submission_client`: Backend submission client.
//! - `validators`: CPF, email, phone and CEP checks.

pub mod core;
pub mod integrations;

pub mod age;
pub mod cache_validator;
pub mod cep_client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod models;
pub mod render;
pub mod submission;
pub mod submission_client;
pub mod validators;
