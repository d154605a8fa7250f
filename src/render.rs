use crate::controller::EnrollmentForm;
use crate::models::{FieldKey, Marker, Role};
use serde::Serialize;

/// Render-ready view of one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    /// Element id (`resp-cep-input`).
    pub id: String,
    pub value: String,
    pub required: bool,
    pub disabled: bool,
    /// Bootstrap validation classes.
    pub classes: Vec<&'static str>,
}

/// Render-ready view of the whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub classes: Vec<&'static str>,
    pub guardian_section_visible: bool,
    pub fields: Vec<FieldView>,
    pub notices: Vec<String>,
}

impl FormView {
    pub fn field(&self, id: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.id == id)
    }
}

fn marker_class(marker: Option<Marker>) -> Vec<&'static str> {
    match marker {
        Some(Marker::Valid) => vec!["is-valid"],
        Some(Marker::Invalid) => vec!["is-invalid"],
        None => Vec::new(),
    }
}

/// Projects the form state into what the page should display.
///
/// Guardian fields are always listed; the section flag decides visibility.
pub fn project(form: &EnrollmentForm) -> FormView {
    let mut classes = vec!["needs-validation"];
    if form.was_validated {
        classes.push("was-validated");
    }

    let fields = [Role::Applicant, Role::Guardian]
        .into_iter()
        .flat_map(|role| {
            let person = form.person(role);
            FieldKey::ALL.into_iter().map(move |key| {
                let field = person.field(key);
                FieldView {
                    id: format!("{}{}", role.prefix(), key.dom_id()),
                    value: field.value.clone(),
                    required: field.required,
                    disabled: field.disabled,
                    classes: marker_class(field.marker),
                }
            })
        })
        .collect();

    FormView {
        classes,
        guardian_section_visible: form.guardian_visible,
        fields,
        notices: form.notices().iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::validate_form;

    #[test]
    fn test_fresh_form_view() {
        let view = project(&EnrollmentForm::new());

        assert_eq!(view.classes, vec!["needs-validation"]);
        assert!(!view.guardian_section_visible);
        assert_eq!(view.fields.len(), 30);

        let street = view.field("resp-logradouro").unwrap();
        assert!(street.disabled);
        assert!(!street.required);
        assert!(view.field("cep-input").unwrap().required);
    }

    #[test]
    fn test_markers_become_classes() {
        let mut form = EnrollmentForm::new();
        form.set_value(Role::Applicant, FieldKey::Email, "ana@example.com");
        validate_form(&mut form);
        form.was_validated = true;

        let view = project(&form);
        assert!(view.classes.contains(&"was-validated"));
        assert_eq!(view.field("email").unwrap().classes, vec!["is-valid"]);
        assert_eq!(view.field("cpf").unwrap().classes, vec!["is-invalid"]);
        assert!(view.field("rg").unwrap().classes.is_empty());
    }
}
