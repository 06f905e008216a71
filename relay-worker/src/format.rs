//! Record normalization through alias tables.
//!
//! Inbound data arrives with either Portuguese or English field names. Each
//! canonical field lists its accepted spellings in priority order, and the
//! first one carrying a value wins.

use serde_json::{Map, Value};

/// A loosely-typed input record (CSV row or JSON object).
pub type Record = Map<String, Value>;

/// `(canonical field, aliases in priority order)`
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

/// Canonical contact schema accepted by the sandbox backend.
pub const CONTACT_FIELDS: AliasTable = &[
    ("nome", &["nome", "name"]),
    ("email", &["email"]),
    ("telefone", &["telefone", "phone"]),
    ("endereco", &["endereco", "address"]),
    ("cidade", &["cidade", "city"]),
    ("estado", &["estado", "state"]),
    ("cep", &["cep", "zipcode"]),
    ("cpf", &["cpf", "document"]),
    ("data_nascimento", &["data_nascimento", "birthdate"]),
];

/// Product attributes exported to CSV, keyed by CSV column id.
pub const PRODUCT_FIELDS: AliasTable = &[
    ("nome", &["nome", "name"]),
    ("descricao", &["descricao", "description"]),
    ("preco", &["preco", "price"]),
    ("categoria", &["categoria", "category"]),
    ("marca", &["marca", "brand"]),
    ("estoque", &["estoque", "stock"]),
    ("ativo", &["ativo", "active"]),
    ("sku", &["sku"]),
    ("createdAt", &["createdAt"]),
    ("updatedAt", &["updatedAt"]),
];

/// HubSpot contact properties the relay forwards.
pub const HUBSPOT_CONTACT_FIELDS: AliasTable = &[
    ("email", &["email"]),
    ("firstname", &["firstname"]),
    ("lastname", &["lastname"]),
    ("phone", &["phone"]),
    ("company", &["company"]),
];

/// HubSpot deal properties the relay forwards.
pub const HUBSPOT_DEAL_FIELDS: AliasTable = &[
    ("dealname", &["dealname"]),
    ("amount", &["amount"]),
    ("dealstage", &["dealstage"]),
    ("pipeline", &["pipeline"]),
];

/// Whether a value counts as present. Null and empty strings do not.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Return the first present value among `aliases`.
pub fn first_present<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .find(|value| is_present(value))
}

/// Project `record` onto `table`, omitting fields with no present alias.
pub fn apply_aliases(record: &Record, table: AliasTable) -> Record {
    table
        .iter()
        .filter_map(|(canonical, aliases)| {
            first_present(record, aliases).map(|v| (canonical.to_string(), v.clone()))
        })
        .collect()
}

/// Normalize a contact into the sandbox backend schema.
pub fn format_contact(record: &Record) -> Record {
    apply_aliases(record, CONTACT_FIELDS)
}

/// Normalize a HubSpot contact payload into CRM properties.
pub fn format_hubspot_contact(record: &Record) -> Record {
    apply_aliases(record, HUBSPOT_CONTACT_FIELDS)
}

/// Normalize a HubSpot deal payload into CRM properties.
pub fn format_hubspot_deal(record: &Record) -> Record {
    apply_aliases(record, HUBSPOT_DEAL_FIELDS)
}

/// The identifier used for a record in dispatch outcomes and logs.
pub fn record_email(record: &Record) -> Option<String> {
    match first_present(record, &["email"])? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Render a value as a flat cell: strings verbatim, absent as empty.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
