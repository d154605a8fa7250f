/// Dependent-section controller
///
/// Owns the form state and applies the event-driven rules:
/// 1. Guardian section visibility and required-ness from the applicant's age
/// 2. CEP formatting and lookup-driven address field state
/// 3. Per-field validation markers
use crate::age::{compute_age, is_minor, parse_birth_date};
use crate::cep_client::PostalCodeLookup;
use crate::errors::AppError;
use crate::models::{CepAddress, Field, FieldKey, Notice, PersonForm, Role, Rule, Sex};
use crate::validators::{digits_only, format_postal_code, CEP_LEN};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validates one field and updates its marker.
///
/// An optional field left empty passes and loses any marker.
pub fn validate_field(field: &mut Field, rule: Rule) -> bool {
    if !field.required && field.is_empty() {
        field.clear_marker();
        return true;
    }

    let valid = rule.evaluate(&field.value);
    field.set_marker(valid);
    valid
}

/// A CEP lookup that has been started and not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    pub role: Role,
    /// Digit-only CEP to query.
    pub cep: String,
    generation: u64,
}

/// Whether a lookup result was applied to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupApplication {
    Applied,
    /// A newer lookup or CEP edit superseded this one; the result was dropped.
    Stale,
}

/// In-memory state of one enrollment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentForm {
    pub applicant: PersonForm,
    pub guardian: PersonForm,
    pub guardian_visible: bool,
    pub was_validated: bool,
    notices: Vec<Notice>,
}

impl Default for EnrollmentForm {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollmentForm {
    /// Fresh form with the guardian section hidden.
    pub fn new() -> Self {
        let mut form = Self {
            applicant: PersonForm::applicant(),
            guardian: PersonForm::guardian(),
            guardian_visible: false,
            was_validated: false,
            notices: Vec::new(),
        };
        form.hide_guardian();
        form
    }

    pub fn person(&self, role: Role) -> &PersonForm {
        match role {
            Role::Applicant => &self.applicant,
            Role::Guardian => &self.guardian,
        }
    }

    pub fn person_mut(&mut self, role: Role) -> &mut PersonForm {
        match role {
            Role::Applicant => &mut self.applicant,
            Role::Guardian => &mut self.guardian,
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Hands pending notices to the caller.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        tracing::info!("Notice: {}", notice);
        self.notices.push(notice);
    }

    /// Stores a raw value typed or selected by the user.
    ///
    /// The sex field only keeps recognised options, so anything else reads as
    /// "no selection".
    pub fn set_value(&mut self, role: Role, key: FieldKey, value: &str) {
        let stored = match key {
            FieldKey::Sex => Sex::parse(value)
                .map(|sex| sex.as_str().to_string())
                .unwrap_or_default(),
            _ => value.to_string(),
        };
        self.person_mut(role).field_mut(key).value = stored;
    }

    pub fn select_sex(&mut self, role: Role, sex: Sex) {
        self.person_mut(role).sex.value = sex.as_str().to_string();
    }

    // ============ Guardian Section ============

    /// Re-evaluates the applicant's age and shows or hides the guardian section.
    ///
    /// A missing or unparseable birth date counts as "not a minor".
    pub fn on_birth_date_change(&mut self, today: NaiveDate) {
        let minor = parse_birth_date(&self.applicant.birth_date.value)
            .map(|birth| is_minor(compute_age(birth, today)))
            .unwrap_or(false);

        tracing::debug!("Applicant birth date changed, minor: {}", minor);

        if minor {
            self.show_guardian();
        } else {
            self.hide_guardian();
        }
    }

    /// Shows the guardian section and requires every non-derived guardian field.
    pub fn show_guardian(&mut self) {
        self.guardian_visible = true;

        for key in FieldKey::ALL {
            if key.is_derived() {
                continue;
            }
            let field = self.guardian.field_mut(key);
            field.required = true;
            field.clear_marker();
        }

        tracing::info!("Guardian section shown");
    }

    /// Hides the guardian section and clears everything it holds.
    ///
    /// Derived address fields end up empty and disabled and the CEP is blank,
    /// so showing the section again starts from a fresh lookup.
    pub fn hide_guardian(&mut self) {
        let was_visible = self.guardian_visible;
        self.guardian_visible = false;

        for key in FieldKey::ALL {
            let field = self.guardian.field_mut(key);
            field.required = false;
            field.value.clear();
            field.clear_marker();
            field.disabled = key.is_derived();
        }

        // Any lookup still in flight belongs to the discarded data
        if was_visible || self.guardian.lookup_pending {
            self.guardian.supersede_lookups();
        }

        tracing::debug!("Guardian section hidden");
    }

    // ============ Address / CEP ============

    /// Handles typing in a CEP input and returns the formatted value.
    ///
    /// A new code invalidates any previous lookup: address fields are cleared
    /// and enabled and an in-flight lookup for this person becomes stale.
    pub fn on_postal_code_input(&mut self, role: Role, raw: &str) -> String {
        let formatted = format_postal_code(raw);
        let person = self.person_mut(role);

        person.postal_code.value = formatted.clone();
        person.postal_code.clear_marker();
        person.reset_address();
        for key in FieldKey::DERIVED {
            person.field_mut(key).set_marker(true);
        }
        person.supersede_lookups();

        formatted
    }

    /// First half of a CEP blur: checks the code and tags a new lookup.
    ///
    /// Returns `None` (and marks the CEP invalid) when the code does not have
    /// eight digits; no lookup should be made in that case.
    pub fn begin_postal_lookup(&mut self, role: Role) -> Option<PendingLookup> {
        let person = self.person_mut(role);
        let cep = digits_only(&person.postal_code.value);

        person.reset_address();

        if cep.len() != CEP_LEN {
            // A newer blur wins even when it does not query anything
            person.supersede_lookups();
            person.postal_code.set_marker(false);
            tracing::debug!("Skipping lookup for malformed CEP '{}'", cep);
            return None;
        }

        let generation = person.start_lookup();
        Some(PendingLookup {
            role,
            cep,
            generation,
        })
    }

    /// Second half of a CEP blur: applies the lookup outcome unless superseded.
    pub fn complete_postal_lookup(
        &mut self,
        pending: PendingLookup,
        outcome: Result<Option<CepAddress>, AppError>,
    ) -> LookupApplication {
        let person = self.person_mut(pending.role);

        if person.lookup_generation != pending.generation {
            tracing::debug!(
                "Dropping stale lookup for CEP {} (generation {} < {})",
                pending.cep,
                pending.generation,
                person.lookup_generation
            );
            return LookupApplication::Stale;
        }
        person.lookup_pending = false;

        let notice = match outcome {
            Ok(Some(address)) => {
                person.fill_address(&address);
                person.postal_code.set_marker(true);
                None
            }
            Ok(None) => {
                person.reset_address();
                person.postal_code.set_marker(false);
                Some(Notice::PostalCodeNotFound)
            }
            Err(e) => {
                tracing::error!("Error looking up CEP {}: {}", pending.cep, e);
                person.reset_address();
                person.postal_code.set_marker(false);
                Some(Notice::PostalCodeLookupFailed)
            }
        };

        if let Some(notice) = notice {
            self.push_notice(notice);
        }

        LookupApplication::Applied
    }

    /// Handles a CEP blur end to end.
    pub async fn lookup_postal_code<L: PostalCodeLookup>(
        &mut self,
        role: Role,
        lookup: &L,
    ) -> Option<LookupApplication> {
        let pending = self.begin_postal_lookup(role)?;
        let outcome = lookup.lookup(&pending.cep).await;
        Some(self.complete_postal_lookup(pending, outcome))
    }

    // ============ Per-field checks ============

    /// Validates one field of one person against its bound rule.
    pub fn validate(&mut self, role: Role, key: FieldKey) -> bool {
        validate_field(self.person_mut(role).field_mut(key), key.rule())
    }

    /// Handles leaving the CPF input.
    pub fn on_identifier_blur(&mut self, role: Role) -> bool {
        let valid = self.validate(role, FieldKey::Cpf);

        let person = self.person(role);
        if !person.cpf.is_empty() && person.birth_date.is_empty() {
            tracing::warn!("{:?} CPF entered before birth date", role);
        }

        valid
    }

    pub fn on_email_input(&mut self, role: Role, raw: &str) -> bool {
        self.set_value(role, FieldKey::Email, raw);
        self.validate(role, FieldKey::Email)
    }

    pub fn on_phone_input(&mut self, role: Role, raw: &str) -> bool {
        self.set_value(role, FieldKey::Phone, raw);
        self.validate(role, FieldKey::Phone)
    }

    /// Blanks every input, drops validation state and hides the guardian.
    pub fn reset(&mut self) {
        for role in [Role::Applicant, Role::Guardian] {
            let person = self.person_mut(role);
            for key in FieldKey::ALL {
                let field = person.field_mut(key);
                field.value.clear();
                field.clear_marker();
                field.disabled = false;
            }
            person.supersede_lookups();
        }
        self.was_validated = false;
        self.hide_guardian();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Marker;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paulista() -> CepAddress {
        CepAddress {
            street: "Avenida Paulista".to_string(),
            complement: None,
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            region: "SP".to_string(),
        }
    }

    #[test]
    fn test_initial_state_hides_guardian() {
        let form = EnrollmentForm::new();
        assert!(!form.guardian_visible);
        assert!(form.guardian.street.disabled);
        assert!(!form.guardian.cpf.required);
        assert!(!form.applicant.street.disabled);
    }

    #[test]
    fn test_validate_field_optional_empty_clears_marker() {
        let mut field = Field {
            marker: Some(Marker::Invalid),
            ..Field::default()
        };
        assert!(validate_field(&mut field, FieldKey::Email.rule()));
        assert_eq!(field.marker, None);

        field.value = "not-an-email".to_string();
        assert!(!validate_field(&mut field, FieldKey::Email.rule()));
        assert_eq!(field.marker, Some(Marker::Invalid));
    }

    #[test]
    fn test_show_guardian_requires_non_derived_fields() {
        let mut form = EnrollmentForm::new();
        form.guardian.cpf.marker = Some(Marker::Invalid);
        form.show_guardian();

        assert!(form.guardian_visible);
        assert!(form.guardian.cpf.required);
        assert!(form.guardian.complement.required);
        assert!(form.guardian.sex.required);
        assert!(form.guardian.race.required);
        assert!(!form.guardian.street.required);
        assert_eq!(form.guardian.cpf.marker, None);
    }

    #[test]
    fn test_birth_date_drives_guardian_section() {
        let mut form = EnrollmentForm::new();
        let today = date(2024, 6, 14);

        form.set_value(Role::Applicant, FieldKey::BirthDate, "2007-01-10");
        form.on_birth_date_change(today);
        assert!(form.guardian_visible);

        form.set_value(Role::Applicant, FieldKey::BirthDate, "2000-01-10");
        form.on_birth_date_change(today);
        assert!(!form.guardian_visible);

        form.set_value(Role::Applicant, FieldKey::BirthDate, "");
        form.on_birth_date_change(today);
        assert!(!form.guardian_visible);
    }

    #[test]
    fn test_postal_code_input_resets_address() {
        let mut form = EnrollmentForm::new();
        form.applicant.fill_address(&paulista());
        form.applicant.number.value = "1578".to_string();
        form.applicant.postal_code.marker = Some(Marker::Valid);

        let shown = form.on_postal_code_input(Role::Applicant, "01310930");

        assert_eq!(shown, "01310-930");
        assert_eq!(form.applicant.postal_code.value, "01310-930");
        assert_eq!(form.applicant.postal_code.marker, None);
        assert!(form.applicant.street.value.is_empty());
        assert!(!form.applicant.street.disabled);
        assert_eq!(form.applicant.street.marker, Some(Marker::Valid));
        assert!(form.applicant.number.value.is_empty());
    }

    #[test]
    fn test_short_postal_code_skips_lookup() {
        let mut form = EnrollmentForm::new();
        form.on_postal_code_input(Role::Applicant, "0131");

        assert!(form.begin_postal_lookup(Role::Applicant).is_none());
        assert_eq!(form.applicant.postal_code.marker, Some(Marker::Invalid));
    }

    #[test]
    fn test_lookup_success_locks_derived_fields() {
        let mut form = EnrollmentForm::new();
        form.on_postal_code_input(Role::Applicant, "01310-930");

        let pending = form.begin_postal_lookup(Role::Applicant).unwrap();
        assert_eq!(pending.cep, "01310930");

        let applied = form.complete_postal_lookup(pending, Ok(Some(paulista())));
        assert_eq!(applied, LookupApplication::Applied);
        assert_eq!(form.applicant.city.value, "São Paulo");
        assert!(form.applicant.city.disabled);
        assert_eq!(form.applicant.postal_code.marker, Some(Marker::Valid));
        assert!(form.notices().is_empty());
    }

    #[test]
    fn test_lookup_failure_notice_differs_from_not_found() {
        let mut form = EnrollmentForm::new();
        form.on_postal_code_input(Role::Applicant, "01310930");
        let pending = form.begin_postal_lookup(Role::Applicant).unwrap();

        form.complete_postal_lookup(
            pending,
            Err(AppError::ConnectionFailed("refused".to_string())),
        );

        assert_eq!(form.take_notices(), vec![Notice::PostalCodeLookupFailed]);
        assert!(!form.applicant.street.disabled);
        assert_eq!(form.applicant.postal_code.marker, Some(Marker::Invalid));
    }

    #[test]
    fn test_stale_lookup_is_discarded() {
        let mut form = EnrollmentForm::new();
        form.on_postal_code_input(Role::Applicant, "01310930");
        let first = form.begin_postal_lookup(Role::Applicant).unwrap();

        form.on_postal_code_input(Role::Applicant, "20040020");
        let second = form.begin_postal_lookup(Role::Applicant).unwrap();

        let centro = CepAddress {
            street: "Avenida Rio Branco".to_string(),
            complement: None,
            neighborhood: "Centro".to_string(),
            city: "Rio de Janeiro".to_string(),
            region: "RJ".to_string(),
        };

        assert_eq!(
            form.complete_postal_lookup(second, Ok(Some(centro))),
            LookupApplication::Applied
        );
        assert_eq!(
            form.complete_postal_lookup(first, Ok(Some(paulista()))),
            LookupApplication::Stale
        );
        assert_eq!(form.applicant.city.value, "Rio de Janeiro");
    }

    #[test]
    fn test_malformed_blur_supersedes_pending_lookup() {
        let mut form = EnrollmentForm::new();
        form.on_postal_code_input(Role::Applicant, "01310930");
        let first = form.begin_postal_lookup(Role::Applicant).unwrap();

        form.set_value(Role::Applicant, FieldKey::PostalCode, "0131");
        assert!(form.begin_postal_lookup(Role::Applicant).is_none());

        assert_eq!(
            form.complete_postal_lookup(first, Ok(Some(paulista()))),
            LookupApplication::Stale
        );
        assert_eq!(form.applicant.postal_code.value, "0131");
        assert_eq!(form.applicant.postal_code.marker, Some(Marker::Invalid));
        assert!(form.applicant.street.value.is_empty());
        assert!(!form.applicant.street.disabled);
    }

    #[test]
    fn test_hide_guardian_twice_equals_once() {
        let mut form = EnrollmentForm::new();
        form.show_guardian();
        form.set_value(Role::Guardian, FieldKey::Name, "Marta Lima");

        form.hide_guardian();
        let once = form.clone();
        form.hide_guardian();

        assert_eq!(form, once);
    }

    #[test]
    fn test_hide_guardian_invalidates_pending_lookup() {
        let mut form = EnrollmentForm::new();
        form.show_guardian();
        form.on_postal_code_input(Role::Guardian, "01310930");
        let pending = form.begin_postal_lookup(Role::Guardian).unwrap();

        form.hide_guardian();

        assert_eq!(
            form.complete_postal_lookup(pending, Ok(Some(paulista()))),
            LookupApplication::Stale
        );
        assert!(form.guardian.street.value.is_empty());
        assert!(form.guardian.street.disabled);
    }

    #[test]
    fn test_sex_value_normalised() {
        let mut form = EnrollmentForm::new();
        form.set_value(Role::Applicant, FieldKey::Sex, "F");
        assert_eq!(form.applicant.selected_sex(), Some(Sex::Feminino));

        form.set_value(Role::Applicant, FieldKey::Sex, "x");
        assert!(form.applicant.sex.value.is_empty());
    }

    #[test]
    fn test_identifier_blur_marks_cpf() {
        let mut form = EnrollmentForm::new();
        form.set_value(Role::Applicant, FieldKey::Cpf, "529.982.247-25");
        assert!(form.on_identifier_blur(Role::Applicant));
        assert_eq!(form.applicant.cpf.marker, Some(Marker::Valid));

        form.set_value(Role::Applicant, FieldKey::Cpf, "529.982.247-24");
        assert!(!form.on_identifier_blur(Role::Applicant));
        assert_eq!(form.applicant.cpf.marker, Some(Marker::Invalid));
    }
}
