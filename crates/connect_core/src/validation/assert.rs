//! Assert-mode primitives for isolated fields.
//!
//! # Responsibility
//! - Validate and normalize one raw field value at a time.
//! - Share constraint checks with the schema walker so both modes report
//!   identical messages.
//!
//! # Invariants
//! - Assert mode stops at the first failed constraint; the returned error
//!   carries exactly one violation.
//! - Defaults apply only when the field is absent or `null`, never when it is
//!   present but invalid.

use crate::validation::pattern::Pattern;
use crate::validation::violation::{FieldPath, ValidationError, ValidationResult, Violation};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// JSON value kind used in type-mismatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    fn article(self) -> &'static str {
        match self {
            Self::Array | Self::Object => "an",
            _ => "a",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Sign constraint for numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Any,
    Positive,
    NonNegative,
}

/// Closed set of string values with stable wire names.
pub trait StringEnum: Copy + Eq + 'static {
    const VARIANTS: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.as_str() == value)
    }

    fn wire_names() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|variant| variant.as_str()).collect()
    }
}

/// Failed check: message plus optional context.
pub(crate) type CheckFailure = (String, Option<String>);

fn failure(message: impl Into<String>) -> CheckFailure {
    (message.into(), None)
}

pub(crate) fn type_mismatch(expected: ValueKind, actual: &Value) -> CheckFailure {
    failure(format!(
        "must be {} {expected}, got {}",
        expected.article(),
        ValueKind::of(actual)
    ))
}

pub(crate) fn check_string(value: &Value, allow_empty: bool) -> Result<&str, CheckFailure> {
    let Value::String(raw) = value else {
        return Err(type_mismatch(ValueKind::String, value));
    };
    if !allow_empty && raw.trim().is_empty() {
        return Err(failure("must not be empty or whitespace"));
    }
    Ok(raw.as_str())
}

pub(crate) fn check_pattern(raw: &str, pattern: &Pattern) -> Result<(), CheckFailure> {
    if pattern.is_match(raw) {
        return Ok(());
    }
    Err((
        format!("must be a valid {}", pattern.name()),
        Some(format!("got `{raw}`, example: {}", pattern.example())),
    ))
}

pub(crate) fn check_uuid(value: &Value) -> Result<Uuid, CheckFailure> {
    let Value::String(raw) = value else {
        return Err(type_mismatch(ValueKind::String, value));
    };
    // Only the hyphenated form is accepted in configuration.
    if raw.len() != 36 {
        return Err(invalid_uuid(raw));
    }
    Uuid::parse_str(raw).map_err(|_| invalid_uuid(raw))
}

fn invalid_uuid(raw: &str) -> CheckFailure {
    (
        "must be a valid UUID".to_string(),
        Some(format!(
            "got `{raw}`, example: 22222222-2222-4222-8222-222222222222"
        )),
    )
}

pub(crate) fn check_number(value: &Value, sign: Sign, integer: bool) -> Result<f64, CheckFailure> {
    let Some(number) = value.as_f64() else {
        return Err(type_mismatch(ValueKind::Number, value));
    };
    if !number.is_finite() {
        return Err(failure("must be a finite number"));
    }
    if integer && number.fract() != 0.0 {
        return Err(failure("must be a whole number"));
    }
    match sign {
        Sign::Positive if number <= 0.0 => Err(failure("must be greater than zero")),
        Sign::NonNegative if number < 0.0 => Err(failure("must not be negative")),
        _ => Ok(number),
    }
}

pub(crate) fn check_enum<'v>(value: &'v Value, allowed: &[&str]) -> Result<&'v str, CheckFailure> {
    let raw = check_string(value, true)?;
    if allowed.contains(&raw) {
        return Ok(raw);
    }
    Err((
        format!("must be one of: {}", allowed.join(", ")),
        Some(format!("got `{raw}`")),
    ))
}

/// Returns the first duplicated array item, rendered as JSON.
pub(crate) fn first_duplicate(items: &[Value]) -> Option<(usize, String)> {
    let mut seen = BTreeSet::new();
    items.iter().enumerate().find_map(|(index, item)| {
        let rendered = item.to_string();
        if seen.insert(rendered.clone()) {
            None
        } else {
            Some((index, rendered))
        }
    })
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|inner| !inner.is_null())
}

fn fail(field: &str, (message, context): CheckFailure) -> ValidationError {
    let mut violation = Violation::new(FieldPath::root().join(field), message);
    violation.context = context;
    ValidationError::single(field, violation)
}

fn missing(field: &str) -> ValidationError {
    fail(field, failure("is required"))
}

/// Non-empty, non-whitespace string.
pub fn string(value: Option<&Value>, field: &str, default: Option<&str>) -> ValidationResult<String> {
    match (present(value), default) {
        (Some(raw), _) => check_string(raw, false)
            .map(str::to_string)
            .map_err(|err| fail(field, err)),
        (None, Some(fallback)) => Ok(fallback.to_string()),
        (None, None) => Err(missing(field)),
    }
}

/// Optional non-empty string; absent and `null` map to `None`.
pub fn optional_string(value: Option<&Value>, field: &str) -> ValidationResult<Option<String>> {
    present(value)
        .map(|raw| string(Some(raw), field, None))
        .transpose()
}

/// String matching `pattern`.
pub fn matches(value: Option<&Value>, field: &str, pattern: &Pattern) -> ValidationResult<String> {
    let raw = string(value, field, None)?;
    check_pattern(&raw, pattern).map_err(|err| fail(field, err))?;
    Ok(raw)
}

pub fn uuid(value: Option<&Value>, field: &str) -> ValidationResult<Uuid> {
    let raw = present(value).ok_or_else(|| missing(field))?;
    check_uuid(raw).map_err(|err| fail(field, err))
}

/// Id reference standing in for a whole value; violations sit at the root so
/// the caller's field path is the one reported.
pub(crate) fn reference_id(value: &Value, label: &str) -> ValidationResult<Uuid> {
    check_uuid(value).map_err(|(message, context)| {
        let mut violation = Violation::new(FieldPath::root(), message);
        violation.context = context;
        ValidationError::single(label, violation)
    })
}

pub fn boolean(value: Option<&Value>, field: &str, default: Option<bool>) -> ValidationResult<bool> {
    match (present(value), default) {
        (Some(Value::Bool(flag)), _) => Ok(*flag),
        (Some(other), _) => Err(fail(field, type_mismatch(ValueKind::Bool, other))),
        (None, Some(fallback)) => Ok(fallback),
        (None, None) => Err(missing(field)),
    }
}

pub fn number(
    value: Option<&Value>,
    field: &str,
    sign: Sign,
    default: Option<f64>,
) -> ValidationResult<f64> {
    match (present(value), default) {
        (Some(raw), _) => check_number(raw, sign, false).map_err(|err| fail(field, err)),
        (None, Some(fallback)) => Ok(fallback),
        (None, None) => Err(missing(field)),
    }
}

/// Whole number strictly greater than zero.
pub fn positive_integer(
    value: Option<&Value>,
    field: &str,
    default: Option<u64>,
) -> ValidationResult<u64> {
    match (present(value), default) {
        (Some(raw), _) => check_number(raw, Sign::Positive, true)
            .map(|number| number as u64)
            .map_err(|err| fail(field, err)),
        (None, Some(fallback)) => Ok(fallback),
        (None, None) => Err(missing(field)),
    }
}

/// Optional whole number greater than or equal to zero.
pub fn optional_count(value: Option<&Value>, field: &str) -> ValidationResult<Option<u32>> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    let number = check_number(raw, Sign::NonNegative, true).map_err(|err| fail(field, err))?;
    if number > f64::from(u32::MAX) {
        return Err(fail(field, failure("is too large")));
    }
    Ok(Some(number as u32))
}

pub fn enum_value<E: StringEnum>(
    value: Option<&Value>,
    field: &str,
    default: Option<E>,
) -> ValidationResult<E> {
    match (present(value), default) {
        (Some(raw), _) => {
            let names = E::wire_names();
            let name = check_enum(raw, &names).map_err(|err| fail(field, err))?;
            E::parse(name).ok_or_else(|| missing(field))
        }
        (None, Some(fallback)) => Ok(fallback),
        (None, None) => Err(missing(field)),
    }
}

/// Array of enum values; rejects unknown members and duplicates.
pub fn enum_set<E: StringEnum>(value: Option<&Value>, field: &str) -> ValidationResult<Vec<E>> {
    let Some(raw) = present(value) else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(fail(field, type_mismatch(ValueKind::Array, raw)));
    };
    let names = E::wire_names();
    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_field = format!("{field}[{index}]");
        let name = check_enum(item, &names).map_err(|err| fail(&item_field, err))?;
        let variant = E::parse(name).ok_or_else(|| missing(&item_field))?;
        if parsed.contains(&variant) {
            return Err(fail(
                &item_field,
                (
                    "must not contain duplicates".to_string(),
                    Some(format!("duplicate: {name}")),
                ),
            ));
        }
        parsed.push(variant);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{
        boolean, enum_set, enum_value, matches, number, optional_string, positive_integer,
        string, uuid, Sign, StringEnum,
    };
    use crate::validation::pattern::CURRENCY_CODE;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red,
        Blue,
    }

    impl StringEnum for Color {
        const VARIANTS: &'static [Self] = &[Self::Red, Self::Blue];

        fn as_str(self) -> &'static str {
            match self {
                Self::Red => "red",
                Self::Blue => "blue",
            }
        }
    }

    #[test]
    fn string_rejects_whitespace_and_applies_default_only_when_absent() {
        let err = string(Some(&json!("   ")), "name", Some("fallback")).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("name must not be empty"));

        assert_eq!(string(None, "name", Some("fallback")).unwrap(), "fallback");
        assert_eq!(
            string(Some(&json!(null)), "name", Some("fallback")).unwrap(),
            "fallback"
        );
        assert!(string(None, "name", None).is_err());
    }

    #[test]
    fn optional_string_maps_null_to_none() {
        assert_eq!(optional_string(Some(&json!(null)), "notes").unwrap(), None);
        assert_eq!(
            optional_string(Some(&json!("x")), "notes").unwrap().as_deref(),
            Some("x")
        );
    }

    #[test]
    fn uuid_requires_hyphenated_form() {
        assert!(uuid(Some(&json!("22222222-2222-4222-8222-222222222222")), "id").is_ok());
        assert!(uuid(Some(&json!("22222222222242228222222222222222")), "id").is_err());
        let err = uuid(Some(&json!(42)), "id").unwrap_err();
        assert!(err.to_string().contains("must be a string, got number"));
    }

    #[test]
    fn number_signs_are_enforced() {
        assert!(number(Some(&json!(0)), "value", Sign::NonNegative, None).is_ok());
        assert!(number(Some(&json!(0)), "value", Sign::Positive, None).is_err());
        assert!(number(Some(&json!(-1)), "value", Sign::NonNegative, None).is_err());
        assert_eq!(number(None, "value", Sign::Any, Some(3.5)).unwrap(), 3.5);
    }

    #[test]
    fn positive_integer_rejects_fractions_and_zero() {
        assert_eq!(positive_integer(Some(&json!(3)), "quantity", None).unwrap(), 3);
        assert!(positive_integer(Some(&json!(1.5)), "quantity", None).is_err());
        assert!(positive_integer(Some(&json!(0)), "quantity", None).is_err());
        assert_eq!(positive_integer(None, "quantity", Some(1)).unwrap(), 1);
    }

    #[test]
    fn pattern_failure_mentions_example() {
        let err = matches(Some(&json!("usd")), "currency", &CURRENCY_CODE).unwrap_err();
        let violation = &err.violations()[0];
        assert_eq!(violation.message, "must be a valid currency code");
        assert!(violation.context.as_deref().unwrap().contains("example: USD"));
    }

    #[test]
    fn enum_value_rejects_unknown_members() {
        assert_eq!(
            enum_value::<Color>(Some(&json!("blue")), "color", None).unwrap(),
            Color::Blue
        );
        let err = enum_value::<Color>(Some(&json!("green")), "color", None).unwrap_err();
        assert!(err.to_string().contains("must be one of: red, blue"));
        assert_eq!(
            enum_value(None, "color", Some(Color::Red)).unwrap(),
            Color::Red
        );
    }

    #[test]
    fn enum_set_rejects_duplicates() {
        assert_eq!(
            enum_set::<Color>(Some(&json!(["red", "blue"])), "colors").unwrap(),
            vec![Color::Red, Color::Blue]
        );
        let err = enum_set::<Color>(Some(&json!(["red", "red"])), "colors").unwrap_err();
        assert!(err.to_string().contains("colors[1] must not contain duplicates"));
    }

    #[test]
    fn boolean_type_mismatch_is_reported() {
        let err = boolean(Some(&json!("yes")), "isSandbox", Some(false)).unwrap_err();
        assert!(err.to_string().contains("must be a boolean, got string"));
    }
}
