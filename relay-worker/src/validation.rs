//! Request validation and input sanitization.
//!
//! Validators collect every field failure before returning, so a client
//! sees all problems with a payload at once.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{AppError, AppResult, FieldError};
use crate::format::Record;

// =============================================================================
// Sanitization
// =============================================================================

/// Strip markup from every string (keys included) at any depth.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (sanitize_str(&k), sanitize_value(v)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

/// Remove `<script>` blocks, `<...>` tags and `javascript:` schemes.
pub fn sanitize_str(input: &str) -> String {
    let without_scripts = remove_script_blocks(input);
    let without_tags = strip_tags(&without_scripts);
    remove_ascii_ci(&without_tags, "javascript:").trim().to_string()
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if close > 0 => rest = &after[close + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn remove_script_blocks(input: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `input`.
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(start) = lower[pos..].find("<script").map(|i| i + pos) {
        match lower[start..].find("</script>").map(|i| i + start) {
            Some(end) => {
                out.push_str(&input[pos..start]);
                pos = end + "</script>".len();
            }
            None => break,
        }
    }
    out.push_str(&input[pos..]);
    out
}

fn remove_ascii_ci(input: &str, needle: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(found) = lower[pos..].find(needle).map(|i| i + pos) {
        out.push_str(&input[pos..found]);
        pos = found + needle.len();
    }
    out.push_str(&input[pos..]);
    out
}

// =============================================================================
// Field validators
// =============================================================================

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw).is_ok()
}

fn digits(input: &str) -> Vec<u32> {
    input.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Two-digit area code (no zeros), optional mobile 9, eight digits.
pub fn is_valid_brazilian_phone(phone: &str) -> bool {
    let d = digits(phone);
    let area_ok = d.len() >= 2 && d[0] != 0 && d[1] != 0;
    match d.len() {
        10 => area_ok,
        11 => area_ok && d[2] == 9,
        _ => false,
    }
}

fn all_same(d: &[u32]) -> bool {
    d.windows(2).all(|w| w[0] == w[1])
}

/// Mod-11 check digit over `d` with weights running down from `start`.
fn cpf_digit(d: &[u32], start: u32) -> u32 {
    let sum: u32 = d.iter().zip((2..=start).rev()).map(|(x, w)| x * w).sum();
    let r = (sum * 10) % 11;
    if r == 10 {
        0
    } else {
        r
    }
}

pub fn is_valid_cpf(cpf: &str) -> bool {
    let d = digits(cpf);
    if d.len() != 11 || all_same(&d) {
        return false;
    }
    cpf_digit(&d[..9], 10) == d[9] && cpf_digit(&d[..10], 11) == d[10]
}

/// CNPJ weights cycle 2..=9 from the rightmost digit.
fn cnpj_digit(d: &[u32]) -> u32 {
    let sum: u32 = d
        .iter()
        .rev()
        .zip((2..=9).cycle())
        .map(|(x, w)| x * w)
        .sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

pub fn is_valid_cnpj(cnpj: &str) -> bool {
    let d = digits(cnpj);
    if d.len() != 14 || all_same(&d) {
        return false;
    }
    cnpj_digit(&d[..12]) == d[12] && cnpj_digit(&d[..13]) == d[13]
}

// =============================================================================
// Request validators
// =============================================================================

fn finish<T>(errors: Vec<FieldError>, value: T) -> AppResult<T> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn as_object(body: &Value) -> AppResult<&Record> {
    body.as_object()
        .ok_or_else(|| AppError::invalid("body", "Corpo da requisição deve ser um objeto"))
}

fn optional_string(record: &Record, field: &str, errors: &mut Vec<FieldError>) {
    if let Some(value) = record.get(field) {
        if !value.is_string() && !value.is_null() {
            errors.push(FieldError::new(field, format!("{} deve ser texto", field)));
        }
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// `POST /api/hubspot/contact`
pub fn validate_contact(body: &Value) -> AppResult<Record> {
    let record = as_object(body)?;
    let mut errors = Vec::new();

    match record.get("email").and_then(Value::as_str) {
        Some(email) if is_valid_email(email) => {}
        _ => errors.push(FieldError::new("email", "Email inválido")),
    }
    for field in ["firstname", "lastname", "phone", "company"] {
        optional_string(record, field, &mut errors);
    }

    finish(errors, record.clone())
}

/// Contact updates carry no required fields, but must be an object.
pub fn validate_contact_update(body: &Value) -> AppResult<Record> {
    as_object(body).cloned()
}

/// `:id` path parameters on contact routes.
pub fn validate_numeric_id(id: &str) -> AppResult<()> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::invalid("id", "ID deve ser numérico"))
    }
}

/// `POST /api/hubspot/deal`
pub fn validate_deal(body: &Value) -> AppResult<Record> {
    let record = as_object(body)?;
    let mut errors = Vec::new();

    let named = match record.get("dealname") {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    };
    if !named {
        errors.push(FieldError::new("dealname", "Nome do negócio é obrigatório"));
    }
    if let Some(amount) = record.get("amount") {
        if !is_numeric(amount) {
            errors.push(FieldError::new("amount", "Valor deve ser numérico"));
        }
    }
    optional_string(record, "dealstage", &mut errors);
    optional_string(record, "pipeline", &mut errors);

    finish(errors, record.clone())
}

/// Validated `POST /api/backend/sync` body.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub entity: String,
    pub action: String,
    pub data: Value,
}

pub const SYNC_ENTITIES: &[&str] = &["contact", "deal", "company"];
pub const SYNC_ACTIONS: &[&str] = &["create", "update", "delete"];

pub fn validate_sync(body: &Value) -> AppResult<SyncRequest> {
    let record = as_object(body)?;
    let mut errors = Vec::new();

    let entity = record.get("entity").and_then(Value::as_str).unwrap_or_default();
    if !SYNC_ENTITIES.contains(&entity) {
        errors.push(FieldError::new("entity", "Entidade inválida"));
    }
    let action = record.get("action").and_then(Value::as_str).unwrap_or_default();
    if !SYNC_ACTIONS.contains(&action) {
        errors.push(FieldError::new("action", "Ação inválida"));
    }
    let data = record.get("data").cloned().unwrap_or(Value::Null);
    if !data.is_object() {
        errors.push(FieldError::new("data", "Dados devem ser um objeto"));
    }

    finish(
        errors,
        SyncRequest {
            entity: entity.to_string(),
            action: action.to_string(),
            data,
        },
    )
}

/// `POST /api/backend/process`: returns `(type, payload)`.
pub fn validate_process(body: &Value) -> AppResult<(String, Record)> {
    let record = as_object(body)?;
    let mut errors = Vec::new();

    let kind = match record.get("type") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            errors.push(FieldError::new("type", "Tipo é obrigatório"));
            String::new()
        }
    };
    let payload = match record.get("payload") {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            errors.push(FieldError::new("payload", "Payload deve ser um objeto"));
            Record::new()
        }
    };

    finish(errors, (kind, payload))
}

/// `POST /api/contacts/send`: one object or a non-empty array of objects.
pub fn validate_contacts_batch(body: &Value) -> AppResult<Vec<Record>> {
    let contacts = match body.get("contacts") {
        None | Some(Value::Null) => {
            return Err(AppError::invalid("contacts", "Campo \"contacts\" é obrigatório"))
        }
        Some(Value::Object(single)) => return Ok(vec![single.clone()]),
        Some(Value::Array(items)) if items.is_empty() => {
            return Err(AppError::invalid(
                "contacts",
                "Campo \"contacts\" não pode ser uma lista vazia",
            ))
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(AppError::invalid(
                "contacts",
                "Campo \"contacts\" deve ser um objeto ou uma lista",
            ))
        }
    };

    let mut errors = Vec::new();
    let mut records = Vec::with_capacity(contacts.len());
    for (index, item) in contacts.iter().enumerate() {
        match item {
            Value::Object(map) => records.push(map.clone()),
            _ => errors.push(FieldError::new(
                format!("contacts[{}]", index),
                "Contato deve ser um objeto",
            )),
        }
    }

    finish(errors, records)
}
