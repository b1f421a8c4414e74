//! Declarative schema descriptors.
//!
//! # Responsibility
//! - Describe the structural contract of one domain type as a rule tree.
//! - Walk an untrusted JSON value against the tree and report every
//!   independent defect with its own path.
//!
//! # Invariants
//! - A wrong-typed value yields one violation; its children are not visited.
//! - Each missing required field, unknown field in a closed object, duplicate
//!   set member and failed constraint yields exactly one violation.
//! - Schemas are built once per type and shared (`&'static Schema`).

use crate::validation::assert::{
    check_enum, check_number, check_pattern, check_string, check_uuid, first_duplicate,
    type_mismatch, CheckFailure, Sign, ValueKind,
};
use crate::validation::pattern::Pattern;
use crate::validation::violation::{
    FieldPath, ValidationError, ValidationResult, Violation, Violations,
};
use serde_json::{Map, Value};

/// One node of a structural constraint tree.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Accepts any present value.
    Any,
    Bool,
    String(StringRule),
    Number(NumberRule),
    Uuid,
    Enum(Vec<&'static str>),
    Array(ArrayRule),
    Object(ObjectRule),
    /// Object with arbitrary keys; every value must satisfy the inner rule.
    Map(MapRule),
    /// First alternative whose JSON kind matches the value is applied.
    OneOf(Vec<Rule>),
}

#[derive(Debug, Clone, Default)]
pub struct StringRule {
    allow_empty: bool,
    pattern: Option<&'static Pattern>,
}

#[derive(Debug, Clone)]
pub struct NumberRule {
    sign: Sign,
    integer: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayRule {
    items: Box<Rule>,
    min_items: usize,
    unique: bool,
}

#[derive(Debug, Clone)]
pub struct MapRule {
    key: Option<&'static Pattern>,
    values: Box<Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectRule {
    fields: Vec<FieldRule>,
    open: bool,
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    name: &'static str,
    rule: Rule,
    required: bool,
}

impl Rule {
    pub fn string() -> Self {
        Self::String(StringRule::default())
    }

    pub fn number() -> Self {
        Self::Number(NumberRule {
            sign: Sign::Any,
            integer: false,
        })
    }

    pub fn integer() -> Self {
        Self::Number(NumberRule {
            sign: Sign::Any,
            integer: true,
        })
    }

    pub fn enumeration(values: impl IntoIterator<Item = &'static str>) -> Self {
        Self::Enum(values.into_iter().collect())
    }

    pub fn array(items: Rule) -> Self {
        Self::Array(ArrayRule {
            items: Box::new(items),
            min_items: 0,
            unique: false,
        })
    }

    pub fn object(fields: impl IntoIterator<Item = FieldRule>) -> Self {
        Self::Object(ObjectRule {
            fields: fields.into_iter().collect(),
            open: false,
        })
    }

    pub fn map(values: Rule) -> Self {
        Self::Map(MapRule {
            key: None,
            values: Box::new(values),
        })
    }

    /// Inline object or a reference to one by UUID.
    pub fn inline_or_id(object: Rule) -> Self {
        Self::OneOf(vec![Self::Uuid, object])
    }

    /// Rejects empty and whitespace-only strings (the default) or allows them.
    pub fn allow_empty(mut self) -> Self {
        if let Self::String(rule) = &mut self {
            rule.allow_empty = true;
        }
        self
    }

    pub fn pattern(mut self, pattern: &'static Pattern) -> Self {
        match &mut self {
            Self::String(rule) => rule.pattern = Some(pattern),
            Self::Map(rule) => rule.key = Some(pattern),
            _ => {}
        }
        self
    }

    pub fn positive(mut self) -> Self {
        if let Self::Number(rule) = &mut self {
            rule.sign = Sign::Positive;
        }
        self
    }

    pub fn non_negative(mut self) -> Self {
        if let Self::Number(rule) = &mut self {
            rule.sign = Sign::NonNegative;
        }
        self
    }

    pub fn min_items(mut self, min_items: usize) -> Self {
        if let Self::Array(rule) = &mut self {
            rule.min_items = min_items;
        }
        self
    }

    /// Array items are treated as a set.
    pub fn unique(mut self) -> Self {
        if let Self::Array(rule) = &mut self {
            rule.unique = true;
        }
        self
    }

    /// Allows fields not declared in the object rule.
    pub fn open(mut self) -> Self {
        if let Self::Object(rule) = &mut self {
            rule.open = true;
        }
        self
    }

    fn expected_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Any | Self::OneOf(_) => None,
            Self::Bool => Some(ValueKind::Bool),
            Self::String(_) | Self::Uuid | Self::Enum(_) => Some(ValueKind::String),
            Self::Number(_) => Some(ValueKind::Number),
            Self::Array(_) => Some(ValueKind::Array),
            Self::Object(_) | Self::Map(_) => Some(ValueKind::Object),
        }
    }

    fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) {
        match self {
            Self::Any => {}
            Self::Bool => {
                if !value.is_boolean() {
                    record(out, path, type_mismatch(ValueKind::Bool, value));
                }
            }
            Self::String(rule) => rule.check(value, path, out),
            Self::Number(rule) => {
                if let Err(failure) = check_number(value, rule.sign, rule.integer) {
                    record(out, path, failure);
                }
            }
            Self::Uuid => {
                if let Err(failure) = check_uuid(value) {
                    record(out, path, failure);
                }
            }
            Self::Enum(allowed) => {
                if let Err(failure) = check_enum(value, allowed) {
                    record(out, path, failure);
                }
            }
            Self::Array(rule) => rule.check(value, path, out),
            Self::Object(rule) => rule.check(value, path, out),
            Self::Map(rule) => rule.check(value, path, out),
            Self::OneOf(alternatives) => {
                let kind = ValueKind::of(value);
                match alternatives
                    .iter()
                    .find(|alternative| alternative.expected_kind() == Some(kind))
                {
                    Some(alternative) => alternative.check(value, path, out),
                    None => {
                        let expected = alternatives
                            .iter()
                            .filter_map(Rule::expected_kind)
                            .map(|kind| kind.to_string())
                            .collect::<Vec<_>>()
                            .join(" or ");
                        record(
                            out,
                            path,
                            (format!("must be {expected}, got {kind}"), None),
                        );
                    }
                }
            }
        }
    }
}

impl StringRule {
    fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) {
        let raw = match check_string(value, self.allow_empty) {
            Ok(raw) => raw,
            Err(failure) => return record(out, path, failure),
        };
        if let Some(pattern) = self.pattern {
            if let Err(failure) = check_pattern(raw, pattern) {
                record(out, path, failure);
            }
        }
    }
}

impl ArrayRule {
    fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) {
        let Value::Array(items) = value else {
            return record(out, path, type_mismatch(ValueKind::Array, value));
        };
        if items.len() < self.min_items {
            let noun = if self.min_items == 1 { "item" } else { "items" };
            record(
                out,
                path,
                (format!("must contain at least {} {noun}", self.min_items), None),
            );
        }
        for (index, item) in items.iter().enumerate() {
            self.items.check(item, &path.join(index), out);
        }
        if self.unique {
            if let Some((index, rendered)) = first_duplicate(items) {
                record(
                    out,
                    &path.join(index),
                    (
                        "must not contain duplicates".to_string(),
                        Some(format!("duplicate: {rendered}")),
                    ),
                );
            }
        }
    }
}

impl MapRule {
    fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) {
        let Value::Object(entries) = value else {
            return record(out, path, type_mismatch(ValueKind::Object, value));
        };
        for (key, entry) in entries {
            let entry_path = path.join(key.as_str());
            if let Some(pattern) = self.key {
                if let Err(failure) = check_pattern(key, pattern) {
                    record(out, &entry_path, failure);
                    continue;
                }
            }
            self.values.check(entry, &entry_path, out);
        }
    }
}

impl ObjectRule {
    fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) {
        let Value::Object(entries) = value else {
            return record(out, path, type_mismatch(ValueKind::Object, value));
        };
        for field in &self.fields {
            let field_path = path.join(field.name);
            match entries.get(field.name) {
                None if field.required => out.report(&field_path, "is required"),
                Some(Value::Null) if field.required => out.report(&field_path, "is required"),
                None | Some(Value::Null) => {}
                Some(inner) => field.rule.check(inner, &field_path, out),
            }
        }
        if self.open {
            return;
        }
        for key in entries.keys() {
            if !self.fields.iter().any(|field| field.name == key) {
                out.report(&path.join(key.as_str()), "is not allowed");
            }
        }
    }
}

fn record(out: &mut Violations, path: &FieldPath, (message, context): CheckFailure) {
    let mut violation = Violation::new(path.clone(), message);
    violation.context = context;
    out.push(violation);
}

/// Required field.
pub fn field(name: &'static str, rule: Rule) -> FieldRule {
    FieldRule {
        name,
        rule,
        required: true,
    }
}

/// Optional field; absent and `null` are both accepted.
pub fn optional(name: &'static str, rule: Rule) -> FieldRule {
    FieldRule {
        name,
        rule,
        required: false,
    }
}

/// Per-type contract: a human label plus the rule tree.
#[derive(Debug, Clone)]
pub struct Schema {
    label: &'static str,
    rules: Rule,
}

impl Schema {
    pub fn new(label: &'static str, rules: Rule) -> Self {
        Self { label, rules }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn rules(&self) -> &Rule {
        &self.rules
    }

    /// Validates `value` in schema mode, reporting every violation at once.
    pub fn validate(&self, value: &Value) -> ValidationResult<()> {
        let mut violations = Violations::new();
        self.rules.check(value, &FieldPath::root(), &mut violations);
        violations.finish(self.label)
    }

    /// Validates `value` and returns its object map.
    pub fn validate_object<'v>(&self, value: &'v Value) -> ValidationResult<&'v Map<String, Value>> {
        self.validate(value)?;
        value.as_object().ok_or_else(|| {
            let (message, _) = type_mismatch(ValueKind::Object, value);
            ValidationError::single(self.label, Violation::new(FieldPath::root(), message))
        })
    }
}
