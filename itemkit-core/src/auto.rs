//! Detection of output fields left at their inherited default
//!
//! Field producers (page objects, extractors) inherit output fields from a
//! base type. Fields of a base that are generated automatically carry an
//! `auto` tag; a producer that overrides such a field clears the tag. The
//! report lists which fields are still auto, for usage telemetry.

use crate::error::{ItemError, Result};
use crate::value::RawMap;
use ahash::AHashSet;
use serde_json::Value;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Metadata key holding the auto tag
pub const AUTO_KEY: &str = "auto";

/// Prefix of [`AutoFieldStats`] keys
pub const STATS_PREFIX: &str = "auto_fields";

/// One output field of a producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    name: &'static str,
    auto: bool,
}

impl OutputField {
    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field is still the inherited default
    pub fn is_auto(&self) -> bool {
        self.auto
    }
}

/// Declared output fields of a producer type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFields {
    fields: Vec<OutputField>,
}

impl OutputFields {
    /// Start an empty set of output fields
    pub fn builder() -> OutputFieldsBuilder {
        OutputFieldsBuilder::default()
    }

    /// Output fields of a base type where every field is auto
    pub fn auto_base<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        names
            .into_iter()
            .fold(Self::builder(), OutputFieldsBuilder::auto_field)
            .build()
    }

    /// Output fields from per-field metadata maps
    ///
    /// A field is auto when its metadata carries `"auto": true`; a missing
    /// or non-boolean tag counts as not auto.
    pub fn from_metadata<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, RawMap)>,
    {
        fields
            .into_iter()
            .fold(Self::builder(), |builder, (name, meta)| {
                let auto = matches!(meta.get(AUTO_KEY), Some(Value::Bool(true)));
                builder.push(name, auto)
            })
            .build()
    }

    /// Copy of these fields with `name` overridden, i.e. no longer auto
    pub fn overriding(&self, name: &str) -> Result<Self> {
        let mut fields = self.clone();
        let field = fields
            .fields
            .iter_mut()
            .find(|field| field.name == name)
            .ok_or_else(|| undeclared("output fields", name))?;
        field.auto = false;
        Ok(fields)
    }

    /// Auto tag of a declared field
    pub fn is_auto(&self, name: &str) -> Result<bool> {
        self.get(name)
            .map(OutputField::is_auto)
            .ok_or_else(|| undeclared("output fields", name))
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&OutputField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &OutputField> {
        self.fields.iter()
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the auto fields, sorted
    pub fn auto_field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .fields
            .iter()
            .filter(|field| field.auto)
            .map(OutputField::name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Summary of the auto fields
    pub fn report(&self) -> AutoFieldReport {
        if self.fields.iter().all(OutputField::is_auto) {
            return AutoFieldReport::AllFields;
        }
        AutoFieldReport::Fields(self.auto_field_names())
    }
}

/// Builder for [`OutputFields`]
#[derive(Debug, Default)]
pub struct OutputFieldsBuilder {
    fields: Vec<OutputField>,
}

impl OutputFieldsBuilder {
    /// Declare a regular field
    pub fn field(self, name: &'static str) -> Self {
        self.push(name, false)
    }

    /// Declare an auto field
    pub fn auto_field(self, name: &'static str) -> Self {
        self.push(name, true)
    }

    fn push(mut self, name: &'static str, auto: bool) -> Self {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.auto = auto,
            None => self.fields.push(OutputField { name, auto }),
        }
        self
    }

    /// Finish
    pub fn build(self) -> OutputFields {
        OutputFields {
            fields: self.fields,
        }
    }
}

/// Auto-field summary of a producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoFieldReport {
    /// Nothing was overridden
    AllFields,
    /// Sorted names of the fields still auto
    Fields(Vec<&'static str>),
}

impl fmt::Display for AutoFieldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoFieldReport::AllFields => f.write_str("(all fields)"),
            AutoFieldReport::Fields(names) => f.write_str(&names.join(" ")),
        }
    }
}

/// A type that produces output fields
pub trait FieldProducer: 'static {
    /// Name used in reports
    fn type_name() -> &'static str;

    /// Declared output fields with their auto tags
    fn output_fields() -> &'static OutputFields;
}

/// Auto tag of `field` on producer `P`
pub fn is_auto<P: FieldProducer>(field: &str) -> Result<bool> {
    P::output_fields()
        .is_auto(field)
        .map_err(|_| undeclared(P::type_name(), field))
}

fn undeclared(owner: &str, field: &str) -> ItemError {
    ItemError::UndeclaredField {
        owner: owner.to_string(),
        field: field.to_string(),
    }
}

/// Auto-field reports collected per producer type
///
/// Each producer type is recorded once. The collector is owned by the
/// caller; wrap it in a lock to share it between threads.
#[derive(Debug, Default)]
pub struct AutoFieldStats {
    seen: AHashSet<TypeId>,
    stats: BTreeMap<String, String>,
}

impl AutoFieldStats {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record producer `P`, returning `false` if it was already recorded
    pub fn track<P: FieldProducer>(&mut self) -> bool {
        if !self.seen.insert(TypeId::of::<P>()) {
            return false;
        }
        let key = format!("{STATS_PREFIX}/{}", P::type_name());
        let report = P::output_fields().report().to_string();
        debug!(%key, %report, "recorded auto fields");
        self.stats.insert(key, report);
        true
    }

    /// Recorded reports, keyed `auto_fields/<type>`
    pub fn stats(&self) -> &BTreeMap<String, String> {
        &self.stats
    }

    /// Number of recorded producers
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
