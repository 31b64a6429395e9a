//! The lower half of the node model: fields, repetitions, components and
//! subcomponents.
//!
//! Containers share storage through `Arc` and deep-copy only on mutation,
//! so cloning a message (or any node) is cheap and two clones diverge only
//! along the mutated path.
//!
//! Leaf text is stored in wire form (escaped); decoding is the escape
//! processor's job and happens on demand in the value accessors.

pub mod composites;
pub mod dtm;
pub mod primitives;

use crate::escape_sequence::EscapeSequence;
use crate::separators::Separators;
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;

/// Outcome of a checked, 1-based read.
///
/// "Absent" (the position is beyond what the source carried) is distinct
/// from "Empty" (the position exists but holds the empty string); HL7
/// receivers treat the two differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence<T> {
    Present(T),
    Empty,
    Absent,
}

impl<T> Presence<T> {
    pub fn as_option(self) -> Option<T> {
        match self {
            Presence::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Presence::Empty)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Presence::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Presence<U> {
        match self {
            Presence::Present(v) => Presence::Present(f(v)),
            Presence::Empty => Presence::Empty,
            Presence::Absent => Presence::Absent,
        }
    }
}

/// A leaf holding a raw (escaped) text span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subcomponent {
    raw: String,
}

impl Subcomponent {
    pub fn new(raw: impl Into<String>) -> Self {
        Subcomponent { raw: raw.into() }
    }

    /// The wire text, escape sequences intact.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The decoded value.  Borrows when no escape sequences are present.
    pub fn value(&self, delims: &Separators) -> Cow<'_, str> {
        if self.raw.contains(delims.escape_char) {
            Cow::Owned(EscapeSequence::new(*delims).decode(self.raw.as_str()).into_owned())
        } else {
            Cow::Borrowed(&self.raw)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// An ordered sequence of subcomponents, 1-based.  A component with one
/// subcomponent is representationally a simple text value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    subcomponents: Arc<Vec<Subcomponent>>,
}

impl Component {
    /// Tokenize wire text on the subcomponent separator.
    pub fn parse(input: &str, delims: &Separators) -> Component {
        let subcomponents = input
            .split(delims.subcomponent)
            .map(Subcomponent::new)
            .collect();
        Component {
            subcomponents: Arc::new(subcomponents),
        }
    }

    /// A component holding a single, already-escaped text value.
    pub fn from_raw(raw: impl Into<String>) -> Component {
        Component {
            subcomponents: Arc::new(vec![Subcomponent::new(raw)]),
        }
    }

    pub fn subcomponents(&self) -> &[Subcomponent] {
        &self.subcomponents
    }

    /// Checked 1-based access.
    pub fn subcomponent(&self, index: usize) -> Presence<&Subcomponent> {
        if index == 0 || index > self.subcomponents.len() {
            return Presence::Absent;
        }
        let sub = &self.subcomponents[index - 1];
        if sub.is_empty() {
            Presence::Empty
        } else {
            Presence::Present(sub)
        }
    }

    /// The simple-value view: the raw text when this component carries
    /// exactly one subcomponent.
    pub fn as_str(&self) -> Option<&str> {
        if self.subcomponents.len() == 1 {
            Some(self.subcomponents[0].raw())
        } else {
            None
        }
    }

    /// Wire form, subcomponents joined by the subcomponent separator.
    pub fn raw(&self, delims: &Separators) -> String {
        let mut out = String::new();
        for (i, sub) in self.subcomponents.iter().enumerate() {
            if i > 0 {
                out.push(delims.subcomponent);
            }
            out.push_str(sub.raw());
        }
        out
    }

    /// Decoded text of the whole component, separators preserved.
    pub fn value(&self, delims: &Separators) -> String {
        if self.subcomponents.len() == 1 {
            return self.subcomponents[0].value(delims).into_owned();
        }
        let mut out = String::new();
        for (i, sub) in self.subcomponents.iter().enumerate() {
            if i > 0 {
                out.push(delims.subcomponent);
            }
            out.push_str(&sub.value(delims));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.subcomponents.iter().all(Subcomponent::is_empty)
    }

    /// Replace (or grow to) the 1-based subcomponent, cloning shared
    /// storage first.
    pub fn set_subcomponent(&mut self, index: usize, raw: impl Into<String>) {
        assert!(index > 0, "subcomponent indices are 1-based");
        let subs = Arc::make_mut(&mut self.subcomponents);
        while subs.len() < index {
            subs.push(Subcomponent::default());
        }
        subs[index - 1] = Subcomponent::new(raw);
    }

    /// True when both components still share the same backing storage.
    pub fn shares_storage(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.subcomponents, &other.subcomponents)
    }
}

/// One occurrence of a field value: an ordered sequence of components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Repetition {
    components: Arc<Vec<Component>>,
}

impl Repetition {
    pub fn parse(input: &str, delims: &Separators) -> Repetition {
        let components = input
            .split(delims.component)
            .map(|c| Component::parse(c, delims))
            .collect();
        Repetition {
            components: Arc::new(components),
        }
    }

    pub fn from_raw(raw: impl Into<String>) -> Repetition {
        Repetition {
            components: Arc::new(vec![Component::from_raw(raw)]),
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Checked 1-based access.
    pub fn component(&self, index: usize) -> Presence<&Component> {
        if index == 0 || index > self.components.len() {
            return Presence::Absent;
        }
        let component = &self.components[index - 1];
        if component.is_empty() {
            Presence::Empty
        } else {
            Presence::Present(component)
        }
    }

    pub fn raw(&self, delims: &Separators) -> String {
        let mut out = String::new();
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                out.push(delims.component);
            }
            out.push_str(&component.raw(delims));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(Component::is_empty)
    }

    pub fn set_component(&mut self, index: usize, component: Component) {
        assert!(index > 0, "component indices are 1-based");
        let components = Arc::make_mut(&mut self.components);
        while components.len() < index {
            components.push(Component::default());
        }
        components[index - 1] = component;
    }

    pub fn shares_storage(&self, other: &Repetition) -> bool {
        Arc::ptr_eq(&self.components, &other.components)
    }
}

/// Represents a single field inside the HL7.  Note that fields can include
/// repeats, components and sub-components.
/// See [the spec](http://www.hl7.eu/HL7v2x/v251/std251/ch02.html#Heading13) for more info.
///
/// A field always holds at least one repetition; an "empty" field is one
/// whose single repetition holds the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    repeats: Arc<Vec<Repetition>>,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            repeats: Arc::new(vec![Repetition::from_raw("")]),
        }
    }
}

impl Field {
    /// Convert the given span of wire text into a field, splitting out
    /// repeats, components and subcomponents.
    pub fn parse(input: &str, delims: &Separators) -> Field {
        let repeats = input
            .split(delims.repeat)
            .map(|r| Repetition::parse(r, delims))
            .collect();
        Field {
            repeats: Arc::new(repeats),
        }
    }

    /// A field holding a single literal value that must not be tokenized
    /// (MSH-1 and MSH-2 carry delimiter characters as data).
    pub fn literal(raw: impl Into<String>) -> Field {
        Field {
            repeats: Arc::new(vec![Repetition::from_raw(raw)]),
        }
    }

    pub fn repeats(&self) -> &[Repetition] {
        &self.repeats
    }

    /// Checked 1-based access to a repetition.
    pub fn repetition(&self, index: usize) -> Presence<&Repetition> {
        if index == 0 || index > self.repeats.len() {
            return Presence::Absent;
        }
        let repetition = &self.repeats[index - 1];
        if repetition.is_empty() {
            Presence::Empty
        } else {
            Presence::Present(repetition)
        }
    }

    /// Checked 1-based access to a component of the first repetition.
    pub fn component(&self, index: usize) -> Presence<&Component> {
        self.repeats[0].component(index)
    }

    /// First repetition, which always exists.
    pub fn first(&self) -> &Repetition {
        &self.repeats[0]
    }

    /// Wire form of the whole field, repeats joined by the repeat separator.
    pub fn raw(&self, delims: &Separators) -> String {
        let mut out = String::new();
        for (i, repetition) in self.repeats.iter().enumerate() {
            if i > 0 {
                out.push(delims.repeat);
            }
            out.push_str(&repetition.raw(delims));
        }
        out
    }

    /// Decoded text of the whole field.
    pub fn value(&self, delims: &Separators) -> String {
        EscapeSequence::new(*delims).decode(self.raw(delims)).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.repeats.iter().all(Repetition::is_empty)
    }

    pub fn repeat_count(&self) -> usize {
        self.repeats.len()
    }

    pub fn set_repetition(&mut self, index: usize, repetition: Repetition) {
        assert!(index > 0, "repetition indices are 1-based");
        let repeats = Arc::make_mut(&mut self.repeats);
        while repeats.len() < index {
            repeats.push(Repetition::from_raw(""));
        }
        repeats[index - 1] = repetition;
    }

    /// Replace a component of the given repetition, growing as needed.
    pub fn set_component(&mut self, repetition: usize, component: usize, value: Component) {
        assert!(repetition > 0, "repetition indices are 1-based");
        let repeats = Arc::make_mut(&mut self.repeats);
        while repeats.len() < repetition {
            repeats.push(Repetition::from_raw(""));
        }
        repeats[repetition - 1].set_component(component, value);
    }

    pub fn shares_storage(&self, other: &Field) -> bool {
        Arc::ptr_eq(&self.repeats, &other.repeats)
    }
}

impl Display for Field {
    /// Wire form under the default separators.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw(&Separators::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> Separators {
        Separators::default()
    }

    #[test]
    fn test_parse_components() {
        let f = Field::parse("xxx^yyy", &d());
        assert_eq!(f.first().components().len(), 2);
    }

    #[test]
    fn test_parse_subcomponents() {
        let f = Field::parse("xxx^yyy&zzz", &d());
        let c = f.component(2).as_option().unwrap();
        assert_eq!(c.subcomponents().len(), 2);
        assert_eq!(c.subcomponent(2).as_option().unwrap().raw(), "zzz");
    }

    #[test]
    fn test_parse_repeats() {
        let f = Field::parse("one~two~three", &d());
        assert_eq!(f.repeat_count(), 3);
        assert_eq!(f.repetition(2).as_option().unwrap().raw(&d()), "two");
    }

    #[test]
    fn test_round_trip_to_wire_form() {
        let f = Field::parse("xxx^yyy&zzz~second", &d());
        assert_eq!(f.raw(&d()), "xxx^yyy&zzz~second");
        assert_eq!(f.to_string(), "xxx^yyy&zzz~second");
    }

    #[test]
    fn test_out_of_range_reads_are_absent_not_empty() {
        let f = Field::parse("a^", &d());
        assert!(f.component(2).is_empty());
        assert!(f.component(3).is_absent());
        assert!(f.repetition(2).is_absent());
    }

    #[test]
    fn test_literal_fields_are_not_tokenized() {
        let f = Field::literal("^~\\&");
        assert_eq!(f.first().components().len(), 1);
        assert_eq!(f.raw(&d()), "^~\\&");
    }

    #[test]
    fn test_value_decodes_escapes_on_demand() {
        let f = Field::parse(r#"Obstetrician \T\ Gynaecologist"#, &d());
        assert_eq!(f.value(&d()), "Obstetrician & Gynaecologist");
    }

    #[test]
    fn test_subcomponent_value_borrows_when_clean() {
        let sub = Subcomponent::new("plain");
        match sub.value(&d()) {
            Cow::Borrowed(s) => assert_eq!(s, "plain"),
            Cow::Owned(_) => panic!("expected a borrow"),
        }
    }

    #[test]
    fn test_clone_shares_storage_until_mutation() {
        let original = Field::parse("a^b^c", &d());
        let clone = original.clone();
        assert!(original.shares_storage(&clone));

        let mut mutated = clone.clone();
        mutated.set_component(1, 2, Component::from_raw("B"));
        assert!(!original.shares_storage(&mutated));
        // the original is untouched
        assert_eq!(original.raw(&d()), "a^b^c");
        assert_eq!(mutated.raw(&d()), "a^B^c");
    }

    #[test]
    fn test_set_component_grows_with_empties() {
        let mut f = Field::default();
        f.set_component(1, 3, Component::from_raw("three"));
        assert_eq!(f.raw(&d()), "^^three");
    }

    #[test]
    fn test_empty_field_is_empty_but_present() {
        let f = Field::parse("", &d());
        assert!(f.is_empty());
        assert_eq!(f.repeat_count(), 1);
    }
}
