use crate::validators::ValidatorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Form Structure ============

/// Which person a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person enrolling.
    Applicant,
    /// Legal guardian, only collected while the applicant is a minor.
    Guardian,
}

impl Role {
    /// Prefix carried by this person's payload keys and element ids.
    pub fn prefix(self) -> &'static str {
        match self {
            Role::Applicant => "",
            Role::Guardian => "resp-",
        }
    }
}

/// Every input a person record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Name,
    BirthDate,
    Rg,
    Cpf,
    Phone,
    Email,
    PostalCode,
    Street,
    Number,
    Complement,
    Neighborhood,
    City,
    Region,
    Sex,
    Race,
}

impl FieldKey {
    /// All keys, in payload order.
    pub const ALL: [FieldKey; 15] = [
        FieldKey::Cpf,
        FieldKey::BirthDate,
        FieldKey::Rg,
        FieldKey::Name,
        FieldKey::Phone,
        FieldKey::Email,
        FieldKey::PostalCode,
        FieldKey::Street,
        FieldKey::Number,
        FieldKey::Complement,
        FieldKey::Neighborhood,
        FieldKey::City,
        FieldKey::Region,
        FieldKey::Sex,
        FieldKey::Race,
    ];

    /// Address fields that are filled from a CEP lookup.
    pub const DERIVED: [FieldKey; 4] = [
        FieldKey::Street,
        FieldKey::Neighborhood,
        FieldKey::City,
        FieldKey::Region,
    ];

    /// Key used in the submission payload.
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldKey::Name => "name",
            FieldKey::BirthDate => "nascimento",
            FieldKey::Rg => "rg",
            FieldKey::Cpf => "cpf",
            FieldKey::Phone => "telefone",
            FieldKey::Email => "email",
            FieldKey::PostalCode => "cep",
            FieldKey::Street => "logradouro",
            FieldKey::Number => "numero",
            FieldKey::Complement => "complemento",
            FieldKey::Neighborhood => "bairro",
            FieldKey::City => "localidade",
            FieldKey::Region => "uf",
            FieldKey::Sex => "sexo",
            FieldKey::Race => "raca",
        }
    }

    /// Element id on the page. Only the CEP input differs from the wire name.
    pub fn dom_id(self) -> &'static str {
        match self {
            FieldKey::PostalCode => "cep-input",
            other => other.wire_name(),
        }
    }

    pub fn is_derived(self) -> bool {
        Self::DERIVED.contains(&self)
    }

    /// Validation rule bound to this key.
    pub fn rule(self) -> Rule {
        match self {
            FieldKey::Cpf => Rule::Check(ValidatorKind::Cpf),
            FieldKey::Email => Rule::Check(ValidatorKind::Email),
            FieldKey::Phone => Rule::Check(ValidatorKind::Phone),
            FieldKey::PostalCode => Rule::Check(ValidatorKind::PostalCode),
            FieldKey::Sex => Rule::SexSelection,
            FieldKey::Race => Rule::Selection,
            _ => Rule::Presence,
        }
    }
}

/// How a field's value is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "check")]
pub enum Rule {
    /// Must be non-blank.
    Presence,
    /// Must pass a value check.
    Check(ValidatorKind),
    /// At least one option must be chosen.
    Selection,
    /// One of the sex radio options must be chosen.
    SexSelection,
}

impl Rule {
    pub fn evaluate(self, value: &str) -> bool {
        match self {
            Rule::Presence | Rule::Selection => !value.trim().is_empty(),
            Rule::Check(kind) => kind.validate(value),
            Rule::SexSelection => Sex::parse(value).is_some(),
        }
    }
}

/// Visual validation state of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Valid,
    Invalid,
}

/// A single form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub value: String,
    pub required: bool,
    pub disabled: bool,
    pub marker: Option<Marker>,
}

impl Field {
    fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn set_marker(&mut self, valid: bool) {
        self.marker = Some(if valid { Marker::Valid } else { Marker::Invalid });
    }

    pub fn clear_marker(&mut self) {
        self.marker = None;
    }
}

/// Radio options for the sex field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Masculino,
    Feminino,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Masculino => "masculino",
            Sex::Feminino => "feminino",
        }
    }

    /// Accepts the radio values and their common abbreviations.
    pub fn parse(raw: &str) -> Option<Sex> {
        match raw.trim().to_lowercase().as_str() {
            "masculino" | "m" => Some(Sex::Masculino),
            "feminino" | "f" => Some(Sex::Feminino),
            _ => None,
        }
    }
}

/// Address data returned by a CEP lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepAddress {
    pub street: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub region: String,
}

// ============ Person Record ============

/// All inputs for one person (applicant or guardian).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonForm {
    pub role: Role,
    pub name: Field,
    pub birth_date: Field,
    pub rg: Field,
    pub cpf: Field,
    pub phone: Field,
    pub email: Field,
    pub postal_code: Field,
    pub street: Field,
    pub number: Field,
    pub complement: Field,
    pub neighborhood: Field,
    pub city: Field,
    pub region: Field,
    pub sex: Field,
    pub race: Field,
    /// Bumped whenever a pending CEP lookup result must no longer be applied.
    pub lookup_generation: u64,
    /// A lookup tagged with the current generation has not completed yet.
    #[serde(default)]
    pub lookup_pending: bool,
}

impl PersonForm {
    /// Applicant inputs: everything required except RG and complement.
    pub fn applicant() -> Self {
        Self {
            role: Role::Applicant,
            name: Field::required(),
            birth_date: Field::required(),
            rg: Field::default(),
            cpf: Field::required(),
            phone: Field::required(),
            email: Field::required(),
            postal_code: Field::required(),
            street: Field::required(),
            number: Field::required(),
            complement: Field::default(),
            neighborhood: Field::required(),
            city: Field::required(),
            region: Field::required(),
            sex: Field::required(),
            race: Field::required(),
            lookup_generation: 0,
            lookup_pending: false,
        }
    }

    /// Guardian inputs start optional; required-ness follows the applicant's age.
    pub fn guardian() -> Self {
        Self {
            role: Role::Guardian,
            name: Field::default(),
            birth_date: Field::default(),
            rg: Field::default(),
            cpf: Field::default(),
            phone: Field::default(),
            email: Field::default(),
            postal_code: Field::default(),
            street: Field::default(),
            number: Field::default(),
            complement: Field::default(),
            neighborhood: Field::default(),
            city: Field::default(),
            region: Field::default(),
            sex: Field::default(),
            race: Field::default(),
            lookup_generation: 0,
            lookup_pending: false,
        }
    }

    pub fn field(&self, key: FieldKey) -> &Field {
        match key {
            FieldKey::Name => &self.name,
            FieldKey::BirthDate => &self.birth_date,
            FieldKey::Rg => &self.rg,
            FieldKey::Cpf => &self.cpf,
            FieldKey::Phone => &self.phone,
            FieldKey::Email => &self.email,
            FieldKey::PostalCode => &self.postal_code,
            FieldKey::Street => &self.street,
            FieldKey::Number => &self.number,
            FieldKey::Complement => &self.complement,
            FieldKey::Neighborhood => &self.neighborhood,
            FieldKey::City => &self.city,
            FieldKey::Region => &self.region,
            FieldKey::Sex => &self.sex,
            FieldKey::Race => &self.race,
        }
    }

    pub fn field_mut(&mut self, key: FieldKey) -> &mut Field {
        match key {
            FieldKey::Name => &mut self.name,
            FieldKey::BirthDate => &mut self.birth_date,
            FieldKey::Rg => &mut self.rg,
            FieldKey::Cpf => &mut self.cpf,
            FieldKey::Phone => &mut self.phone,
            FieldKey::Email => &mut self.email,
            FieldKey::PostalCode => &mut self.postal_code,
            FieldKey::Street => &mut self.street,
            FieldKey::Number => &mut self.number,
            FieldKey::Complement => &mut self.complement,
            FieldKey::Neighborhood => &mut self.neighborhood,
            FieldKey::City => &mut self.city,
            FieldKey::Region => &mut self.region,
            FieldKey::Sex => &mut self.sex,
            FieldKey::Race => &mut self.race,
        }
    }

    /// Makes every lookup started so far stale.
    pub fn supersede_lookups(&mut self) {
        self.lookup_generation += 1;
        self.lookup_pending = false;
    }

    /// Tags a new lookup, superseding earlier ones, and returns its generation.
    pub fn start_lookup(&mut self) -> u64 {
        self.supersede_lookups();
        self.lookup_pending = true;
        self.lookup_generation
    }

    /// Selected sex, if the stored value is one of the radio options.
    pub fn selected_sex(&self) -> Option<Sex> {
        Sex::parse(&self.sex.value)
    }

    /// Clears and enables the derived fields, and clears number and complement.
    pub fn reset_address(&mut self) {
        for key in FieldKey::DERIVED {
            let field = self.field_mut(key);
            field.value.clear();
            field.disabled = false;
        }
        for key in [FieldKey::Number, FieldKey::Complement] {
            let field = self.field_mut(key);
            field.value.clear();
            field.disabled = false;
        }
    }

    /// Copies a lookup result into the derived fields and locks them.
    pub fn fill_address(&mut self, address: &CepAddress) {
        let values = [
            (FieldKey::Street, &address.street),
            (FieldKey::Neighborhood, &address.neighborhood),
            (FieldKey::City, &address.city),
            (FieldKey::Region, &address.region),
        ];
        for (key, value) in values {
            let field = self.field_mut(key);
            field.value = value.trim().to_string();
            // Single-CEP towns come back without street or neighborhood;
            // those stay editable for the user to fill in.
            if field.is_empty() {
                field.disabled = false;
                field.clear_marker();
            } else {
                field.disabled = true;
                field.set_marker(true);
            }
        }

        if let Some(complement) = address.complement.as_deref().filter(|c| !c.is_empty()) {
            self.complement.value = complement.to_string();
        }
    }
}

// ============ Feedback ============

/// User-facing message raised by an event handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum Notice {
    PostalCodeNotFound,
    PostalCodeLookupFailed,
    SubmissionAccepted(Option<String>),
    SubmissionRejected(Option<String>),
    ConnectionFailed,
    UnexpectedError,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PostalCodeNotFound => write!(f, "CEP não encontrado."),
            Notice::PostalCodeLookupFailed => {
                write!(f, "Erro ao consultar o CEP. Tente novamente.")
            }
            Notice::SubmissionAccepted(message) => write!(
                f,
                "{}",
                message
                    .as_deref()
                    .unwrap_or("Formulário enviado com sucesso!")
            ),
            Notice::SubmissionRejected(message) => write!(
                f,
                "Erro ao enviar o formulário: {}",
                message.as_deref().unwrap_or("Erro desconhecido.")
            ),
            Notice::ConnectionFailed => write!(
                f,
                "Erro de conexão ao enviar o formulário. Tente novamente."
            ),
            Notice::UnexpectedError => write!(f, "Ocorreu um erro inesperado. Tente novamente."),
        }
    }
}

/// A field that failed its rule during a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub role: Role,
    pub key: FieldKey,
    pub rule: Rule,
}

impl Violation {
    /// Payload-style name of the offending field (`resp-cpf`).
    pub fn field_name(&self) -> String {
        format!("{}{}", self.role.prefix(), self.key.wire_name())
    }
}
