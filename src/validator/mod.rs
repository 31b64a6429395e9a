//! Conformance validation: structure, data types, cardinality, value sets
//! and custom rules.
//!
//! Validation is side-effect-free: it walks the message against a
//! [`Profile`] and returns a [`ValidationResult`]; nothing on the message
//! changes and nothing raises.

pub mod rules;

pub use rules::{FnRule, Rule, ValidationAccumulator, ValidationFinding, ValidationResult};

use std::str::FromStr;

use crate::diagnostics::{DiagnosticCode, PathLocator, Severity};
use crate::fields::{Field, Presence};
use crate::message::Message;
use crate::schema::{
    self, BindingStrength, MessageStructure, StructureItem, Usage, Version,
};

/// What to validate against.  The default profile resolves the message
/// structure and segment definitions from the structure database using the
/// message's own type, trigger and version.
pub struct Profile {
    /// Validate against this version instead of MSH-12.
    pub version: Option<Version>,
    /// Explicit structure override; otherwise resolved from the database.
    pub structure: Option<&'static MessageStructure>,
    pub check_structure: bool,
    pub check_datatypes: bool,
    pub check_cardinality: bool,
    pub check_value_sets: bool,
    pub custom_rules: Vec<Box<dyn Rule>>,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            version: None,
            structure: None,
            check_structure: true,
            check_datatypes: true,
            check_cardinality: true,
            check_value_sets: true,
            custom_rules: Vec::new(),
        }
    }
}

impl Profile {
    pub fn new() -> Profile {
        Profile::default()
    }

    pub fn version(mut self, version: Version) -> Profile {
        self.version = Some(version);
        self
    }

    pub fn structure(mut self, structure: &'static MessageStructure) -> Profile {
        self.structure = Some(structure);
        self
    }

    pub fn rule(mut self, rule: impl Rule + 'static) -> Profile {
        self.custom_rules.push(Box::new(rule));
        self
    }
}

pub struct Validator;

impl Validator {
    pub fn validate(message: &Message, profile: &Profile) -> ValidationResult {
        let mut acc = ValidationAccumulator::new();

        let version = profile
            .version
            .or_else(|| message.version().and_then(|v| Version::from_str(v).ok()))
            .unwrap_or(Version::V2_5);

        if profile.check_structure {
            structural_pass(message, profile, version, &mut acc);
        }
        if profile.check_datatypes || profile.check_cardinality || profile.check_value_sets {
            field_pass(message, profile, version, &mut acc);
        }
        for rule in &profile.custom_rules {
            rule.apply(message, &mut acc);
        }

        acc.into_result()
    }
}

// ------------------------------------------------------------ structure --

fn structural_pass(message: &Message, profile: &Profile, version: Version, acc: &mut ValidationAccumulator) {
    let structure = match profile.structure {
        Some(structure) => structure,
        None => {
            let message_type = message.message_type().unwrap_or("");
            let trigger = message.trigger_event().unwrap_or("");
            let resolved = schema::message_structure(version, message_type, trigger)
                .or_else(|| schema::message_structure(version, message_type, ""));
            match resolved {
                Some((structure, found)) => {
                    if found != version {
                        acc.info(
                            DiagnosticCode::SchemaFallback,
                            PathLocator::new(),
                            format!(
                                "no {} schema for {}; validating against the {} schema",
                                version, structure.id, found
                            ),
                            "structure",
                        );
                    }
                    structure
                }
                // no schema known for this type: nothing to check
                None => return,
            }
        }
    };

    let segments: Vec<&crate::segments::Segment> = message.segments().iter().collect();
    let mut pos = 0usize;
    match_items(structure.items, &segments, &mut pos, false, acc);

    while pos < segments.len() {
        acc.warning(
            DiagnosticCode::CardinalityViolation,
            PathLocator::segment(pos + 1, segments[pos].id().as_str()),
            format!("segment {} is not part of {}", segments[pos].id(), structure.id),
            "structure",
        );
        pos += 1;
    }
}

/// Greedy sequential matcher.  `in_repeating_group` bounds how many
/// consecutive same-id segments one item may consume, so a repeating
/// group can restart on the next occurrence.
fn match_items(
    items: &[StructureItem],
    segments: &[&crate::segments::Segment],
    pos: &mut usize,
    in_repeating_group: bool,
    acc: &mut ValidationAccumulator,
) {
    for item in items {
        match item {
            StructureItem::Segment { id, usage, cardinality } => {
                let mut count = 0u32;
                loop {
                    if *pos >= segments.len() || segments[*pos].id().as_str() != *id {
                        break;
                    }
                    if in_repeating_group {
                        if let Some(max) = cardinality.max {
                            if count >= max {
                                break;
                            }
                        }
                    }
                    count += 1;
                    *pos += 1;
                }

                if let Some(max) = cardinality.max {
                    if count > max {
                        acc.error(
                            DiagnosticCode::CardinalityViolation,
                            PathLocator::segment((max + 1) as usize, id),
                            format!("{} occurs {} times, allowed {}", id, count, cardinality),
                            "cardinality",
                        );
                    }
                }
                if count < cardinality.min {
                    let severity = if *usage == Usage::Required {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    acc.add(
                        severity,
                        DiagnosticCode::CardinalityViolation,
                        PathLocator {
                            segment_id: Some((*id).to_string()),
                            ..PathLocator::default()
                        },
                        format!("{} occurs {} times, required {}", id, count, cardinality),
                        "cardinality",
                    );
                }
                if count > 0 && *usage == Usage::NotSupported {
                    acc.warning(
                        DiagnosticCode::CardinalityViolation,
                        PathLocator {
                            segment_id: Some((*id).to_string()),
                            ..PathLocator::default()
                        },
                        format!("{} is not supported in this structure", id),
                        "structure",
                    );
                }
            }
            StructureItem::Group { name, cardinality, items } => {
                let repeating = cardinality.max != Some(1);
                let mut reps = 0u32;
                loop {
                    if *pos >= segments.len() || !group_starts(items, segments[*pos].id().as_str()) {
                        break;
                    }
                    let before = *pos;
                    match_items(items, segments, pos, repeating || in_repeating_group, acc);
                    reps += 1;
                    if *pos == before {
                        break;
                    }
                    if let Some(max) = cardinality.max {
                        if reps >= max {
                            break;
                        }
                    }
                }
                if reps < cardinality.min {
                    acc.error(
                        DiagnosticCode::CardinalityViolation,
                        PathLocator::new(),
                        format!("group {} occurs {} times, required {}", name, reps, cardinality),
                        "cardinality",
                    );
                }
            }
        }
    }
}

/// Whether a segment id can open an iteration of the group: it matches an
/// item in the group's first set (everything up to and including the first
/// required item).
fn group_starts(items: &[StructureItem], segment_id: &str) -> bool {
    for item in items {
        match item {
            StructureItem::Segment { id, usage, .. } => {
                if *id == segment_id {
                    return true;
                }
                if *usage == Usage::Required {
                    return false;
                }
            }
            StructureItem::Group { cardinality, items, .. } => {
                if group_starts(items, segment_id) {
                    return true;
                }
                if cardinality.min > 0 {
                    return false;
                }
            }
        }
    }
    false
}

// ---------------------------------------------------------- field passes --

fn field_pass(message: &Message, profile: &Profile, version: Version, acc: &mut ValidationAccumulator) {
    let delims = message.separators();
    let mut fallback_noted = false;

    for (i, segment) in message.segments().iter().enumerate() {
        let id = segment.id().as_str();
        let (def, found) = match schema::segment_def(version, id) {
            Some(found) => found,
            None => continue,
        };
        if found != version && !fallback_noted {
            acc.info(
                DiagnosticCode::SchemaFallback,
                PathLocator::new(),
                format!("segment definitions resolved from version {}", found),
                "schema",
            );
            fallback_noted = true;
        }

        for index in 1..=def.fields.len() {
            let fdef = match def.field(index) {
                Some(fdef) => fdef,
                None => continue,
            };
            let path = PathLocator::segment(i + 1, id).field(index);

            let field = match segment.field(index) {
                Presence::Present(field) => field,
                Presence::Empty | Presence::Absent => {
                    if profile.check_cardinality && fdef.usage == Usage::Required {
                        acc.error(
                            DiagnosticCode::CardinalityViolation,
                            path,
                            format!("required field {} ({}) is missing", index, fdef.name),
                            "cardinality",
                        );
                    }
                    continue;
                }
            };

            if fdef.usage == Usage::NotSupported {
                acc.warning(
                    DiagnosticCode::DataTypeViolation,
                    path.clone(),
                    format!("field {} ({}) is not supported in version {}", index, fdef.name, version),
                    "usage",
                );
            }

            if profile.check_cardinality && !fdef.cardinality.contains(field.repeat_count() as u32) {
                acc.error(
                    DiagnosticCode::CardinalityViolation,
                    path.clone(),
                    format!(
                        "field {} repeats {} times, allowed {}",
                        index,
                        field.repeat_count(),
                        fdef.cardinality
                    ),
                    "cardinality",
                );
            }

            if profile.check_datatypes {
                datatype_check(field, fdef, &path, delims, acc);
            }

            if profile.check_value_sets {
                if let Some(binding) = fdef.binding {
                    value_set_check(field, fdef.datatype, binding, &path, acc);
                }
            }
        }
    }
}

fn datatype_check(
    field: &Field,
    fdef: &schema::FieldDef,
    path: &PathLocator,
    delims: &crate::separators::Separators,
    acc: &mut ValidationAccumulator,
) {
    for (r, repetition) in field.repeats().iter().enumerate() {
        let raw = repetition.raw(delims);
        if let Some(problem) = crate::fields::primitives::check_datatype(fdef.datatype, &raw, delims) {
            acc.error(
                DiagnosticCode::DataTypeViolation,
                path.clone().repetition(r + 1),
                format!("{} does not conform to {}: {}", fdef.name, fdef.datatype, problem),
                "datatype",
            );
        }
        if fdef.max_length > 0 && raw.chars().count() as u32 > fdef.max_length {
            acc.warning(
                DiagnosticCode::DataTypeViolation,
                path.clone().repetition(r + 1),
                format!("{} exceeds the declared maximum length of {}", fdef.name, fdef.max_length),
                "length",
            );
        }
    }
}

fn value_set_check(
    field: &Field,
    datatype: &str,
    binding: schema::TableBinding,
    path: &PathLocator,
    acc: &mut ValidationAccumulator,
) {
    let values = match schema::table_values(binding.table) {
        Some(values) => values,
        // table recognized in the definition but not shipped here
        None => return,
    };

    for (r, repetition) in field.repeats().iter().enumerate() {
        let code = repetition
            .components()
            .first()
            .and_then(|c| c.subcomponents().first())
            .map(|s| s.raw())
            .unwrap_or("");
        if code.is_empty() || values.contains(&code) {
            continue;
        }

        // user-defined (IS) tables never bind harder than a warning
        let severity = match binding.strength {
            BindingStrength::Required if datatype != "IS" => Severity::Error,
            _ => Severity::Warning,
        };
        acc.add(
            severity,
            DiagnosticCode::ValueSetViolation,
            path.clone().repetition(r + 1),
            format!("code '{}' is not in HL7 table {:04}", code, binding.table),
            "value-set",
        );
    }
}
