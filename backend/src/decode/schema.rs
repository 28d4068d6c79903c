//! Field/alias schema builder.
//!
//! Both decoders describe their output through a [`SchemaBuilder`]: one
//! `{ID}_CODE` field plus one human-label field per dimension or attribute,
//! followed by the value fields. Names are made identifier-legal and kept
//! unique, and only code fields may end in the reserved `_CODE` suffix.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::FieldDescriptor;

/// Suffix reserved for code fields.
pub const CODE_SUFFIX: &str = "_CODE";

/// Appended to label fields that would otherwise collide.
const LABEL_SUFFIX: &str = "_LABEL";

static ILLEGAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"));

/// Make a raw identifier or label usable as a field name.
///
/// Spaces and other illegal characters become `_`, names starting with a
/// digit get an `F_` prefix and an empty input becomes `FIELD`.
pub fn sanitize_field_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "FIELD".to_string();
    }
    let cleaned = ILLEGAL_CHARS.replace_all(trimmed, "_").to_string();
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("F_{}", cleaned)
    } else {
        cleaned
    }
}

/// Sanitized, upper-cased label field name.
pub fn label_field_name(raw: &str) -> String {
    sanitize_field_name(raw).to_uppercase()
}

/// Accumulates field descriptors in sink order.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
    taken: HashSet<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the `{ID}_CODE` field for a dimension or attribute. Returns its position.
    pub fn push_code(&mut self, id: &str) -> usize {
        let base = label_field_name(id);
        let mut name = format!("{}{}", base, CODE_SUFFIX);
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{}_{}{}", base, n, CODE_SUFFIX);
            n += 1;
        }
        let alias = format!("{} code", id.trim());
        self.push(FieldDescriptor::text(name, alias))
    }

    /// Add a human-label field. Returns its position.
    pub fn push_label(&mut self, name: &str, alias: &str) -> usize {
        let descriptor = FieldDescriptor::text(label_field_name(name), alias);
        self.push_unique(descriptor)
    }

    /// Add a value field (e.g. `OBS_VALUE`, `UNITS`). Returns its position.
    pub fn push_value(&mut self, descriptor: FieldDescriptor) -> usize {
        self.push_unique(descriptor)
    }

    /// Position of an already pushed field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn build(self) -> Vec<FieldDescriptor> {
        self.fields
    }

    fn push_unique(&mut self, mut descriptor: FieldDescriptor) -> usize {
        if descriptor.name.ends_with(CODE_SUFFIX) || self.taken.contains(&descriptor.name) {
            descriptor.name.push_str(LABEL_SUFFIX);
        }
        let base = descriptor.name.clone();
        let mut n = 2;
        while self.taken.contains(&descriptor.name) {
            descriptor.name = format!("{}_{}", base, n);
            n += 1;
        }
        self.push(descriptor)
    }

    fn push(&mut self, descriptor: FieldDescriptor) -> usize {
        self.taken.insert(descriptor.name.clone());
        self.fields.push(descriptor);
        self.fields.len() - 1
    }
}

/// Replace every alias with its field name.
pub fn strip_aliases(fields: &mut [FieldDescriptor]) {
    for field in fields {
        field.alias = field.name.clone();
    }
}
