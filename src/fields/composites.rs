//! The composite HL7 data types.
//!
//! Composites split their wire text on the component separator and hold
//! decoded constituents in the standard's fixed order.  Absent trailing
//! positions are `None` and are trimmed again on formatting, so parse and
//! format round-trip.

use crate::escape_sequence::EscapeSequence;
use crate::separators::Separators;

/// Split wire text into decoded component values; empty components are
/// `None`.
fn split_components(raw: &str, delims: &Separators) -> Vec<Option<String>> {
    let decoder = EscapeSequence::new(*delims);
    raw.split(delims.component)
        .map(|c| {
            if c.is_empty() {
                None
            } else {
                Some(decoder.decode(c).into_owned())
            }
        })
        .collect()
}

/// Join decoded component values back to wire text, dropping the unused
/// tail.
fn join_components(parts: &[Option<&str>], delims: &Separators) -> String {
    let encoder = EscapeSequence::new(*delims);
    let last = parts.iter().rposition(|p| p.is_some()).map(|i| i + 1).unwrap_or(0);
    let mut out = String::new();
    for (i, part) in parts.iter().take(last).enumerate() {
        if i > 0 {
            out.push(delims.component);
        }
        if let Some(text) = part {
            out.push_str(&encoder.encode(*text));
        }
    }
    out
}

fn take(parts: &mut Vec<Option<String>>, index: usize) -> Option<String> {
    parts.get_mut(index).and_then(|p| p.take())
}

/// `HD` - hierarchic designator: namespace / universal id / id type.
/// Nested inside other composites it travels in subcomponents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hd {
    pub namespace_id: Option<String>,
    pub universal_id: Option<String>,
    pub universal_id_type: Option<String>,
}

impl Hd {
    pub fn parse(raw: &str, delims: &Separators) -> Hd {
        let decoder = EscapeSequence::new(*delims);
        let mut parts = raw.split(delims.subcomponent).map(|s| {
            if s.is_empty() {
                None
            } else {
                Some(decoder.decode(s).into_owned())
            }
        });
        Hd {
            namespace_id: parts.next().flatten(),
            universal_id: parts.next().flatten(),
            universal_id_type: parts.next().flatten(),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        let encoder = EscapeSequence::new(*delims);
        let parts = [
            self.namespace_id.as_deref(),
            self.universal_id.as_deref(),
            self.universal_id_type.as_deref(),
        ];
        let last = parts.iter().rposition(|p| p.is_some()).map(|i| i + 1).unwrap_or(0);
        let mut out = String::new();
        for (i, part) in parts.iter().take(last).enumerate() {
            if i > 0 {
                out.push(delims.subcomponent);
            }
            if let Some(text) = part {
                out.push_str(&encoder.encode(*text));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.namespace_id.is_none() && self.universal_id.is_none() && self.universal_id_type.is_none()
    }
}

/// `CE` - coded element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ce {
    pub identifier: Option<String>,
    pub text: Option<String>,
    pub coding_system: Option<String>,
    pub alternate_identifier: Option<String>,
    pub alternate_text: Option<String>,
    pub alternate_coding_system: Option<String>,
}

impl Ce {
    pub fn parse(raw: &str, delims: &Separators) -> Ce {
        let mut parts = split_components(raw, delims);
        Ce {
            identifier: take(&mut parts, 0),
            text: take(&mut parts, 1),
            coding_system: take(&mut parts, 2),
            alternate_identifier: take(&mut parts, 3),
            alternate_text: take(&mut parts, 4),
            alternate_coding_system: take(&mut parts, 5),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        join_components(
            &[
                self.identifier.as_deref(),
                self.text.as_deref(),
                self.coding_system.as_deref(),
                self.alternate_identifier.as_deref(),
                self.alternate_text.as_deref(),
                self.alternate_coding_system.as_deref(),
            ],
            delims,
        )
    }
}

/// `CX` - extended composite id, the shape of PID-3.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cx {
    pub id_number: Option<String>,
    pub check_digit: Option<String>,
    pub check_digit_scheme: Option<String>,
    pub assigning_authority: Option<Hd>,
    pub identifier_type_code: Option<String>,
    pub assigning_facility: Option<Hd>,
}

impl Cx {
    pub fn parse(raw: &str, delims: &Separators) -> Cx {
        let components: Vec<&str> = raw.split(delims.component).collect();
        let decoder = EscapeSequence::new(*delims);
        let text = |i: usize| -> Option<String> {
            components
                .get(i)
                .filter(|c| !c.is_empty())
                .map(|c| decoder.decode(*c).into_owned())
        };
        let hd = |i: usize| -> Option<Hd> {
            components
                .get(i)
                .filter(|c| !c.is_empty())
                .map(|c| Hd::parse(c, delims))
        };
        Cx {
            id_number: text(0),
            check_digit: text(1),
            check_digit_scheme: text(2),
            assigning_authority: hd(3),
            identifier_type_code: text(4),
            assigning_facility: hd(5),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        let authority = self.assigning_authority.as_ref().map(|h| h.format(delims));
        let facility = self.assigning_facility.as_ref().map(|h| h.format(delims));
        // HD constituents are already wire form; splice them in unescaped
        let encoder = EscapeSequence::new(*delims);
        let parts: [Option<String>; 6] = [
            self.id_number.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.check_digit.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.check_digit_scheme.as_deref().map(|t| encoder.encode(t).into_owned()),
            authority,
            self.identifier_type_code.as_deref().map(|t| encoder.encode(t).into_owned()),
            facility,
        ];
        let last = parts.iter().rposition(|p| p.is_some()).map(|i| i + 1).unwrap_or(0);
        let mut out = String::new();
        for (i, part) in parts.iter().take(last).enumerate() {
            if i > 0 {
                out.push(delims.component);
            }
            if let Some(text) = part {
                out.push_str(text);
            }
        }
        out
    }
}

/// `XPN` - extended person name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Xpn {
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub suffix: Option<String>,
    pub prefix: Option<String>,
    pub degree: Option<String>,
    pub name_type_code: Option<String>,
}

impl Xpn {
    pub fn parse(raw: &str, delims: &Separators) -> Xpn {
        let mut parts = split_components(raw, delims);
        Xpn {
            family_name: take(&mut parts, 0),
            given_name: take(&mut parts, 1),
            middle_name: take(&mut parts, 2),
            suffix: take(&mut parts, 3),
            prefix: take(&mut parts, 4),
            degree: take(&mut parts, 5),
            name_type_code: take(&mut parts, 6),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        join_components(
            &[
                self.family_name.as_deref(),
                self.given_name.as_deref(),
                self.middle_name.as_deref(),
                self.suffix.as_deref(),
                self.prefix.as_deref(),
                self.degree.as_deref(),
                self.name_type_code.as_deref(),
            ],
            delims,
        )
    }
}

/// `XAD` - extended address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Xad {
    pub street_address: Option<String>,
    pub other_designation: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub zip_or_postal_code: Option<String>,
    pub country: Option<String>,
    pub address_type: Option<String>,
    pub other_geographic_designation: Option<String>,
}

impl Xad {
    pub fn parse(raw: &str, delims: &Separators) -> Xad {
        let mut parts = split_components(raw, delims);
        Xad {
            street_address: take(&mut parts, 0),
            other_designation: take(&mut parts, 1),
            city: take(&mut parts, 2),
            state_or_province: take(&mut parts, 3),
            zip_or_postal_code: take(&mut parts, 4),
            country: take(&mut parts, 5),
            address_type: take(&mut parts, 6),
            other_geographic_designation: take(&mut parts, 7),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        join_components(
            &[
                self.street_address.as_deref(),
                self.other_designation.as_deref(),
                self.city.as_deref(),
                self.state_or_province.as_deref(),
                self.zip_or_postal_code.as_deref(),
                self.country.as_deref(),
                self.address_type.as_deref(),
                self.other_geographic_designation.as_deref(),
            ],
            delims,
        )
    }
}

/// `XTN` - extended telecommunication number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Xtn {
    pub telephone_number: Option<String>,
    pub use_code: Option<String>,
    pub equipment_type: Option<String>,
    pub email_address: Option<String>,
    pub country_code: Option<String>,
    pub area_code: Option<String>,
    pub local_number: Option<String>,
    pub extension: Option<String>,
}

impl Xtn {
    pub fn parse(raw: &str, delims: &Separators) -> Xtn {
        let mut parts = split_components(raw, delims);
        Xtn {
            telephone_number: take(&mut parts, 0),
            use_code: take(&mut parts, 1),
            equipment_type: take(&mut parts, 2),
            email_address: take(&mut parts, 3),
            country_code: take(&mut parts, 4),
            area_code: take(&mut parts, 5),
            local_number: take(&mut parts, 6),
            extension: take(&mut parts, 7),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        join_components(
            &[
                self.telephone_number.as_deref(),
                self.use_code.as_deref(),
                self.equipment_type.as_deref(),
                self.email_address.as_deref(),
                self.country_code.as_deref(),
                self.area_code.as_deref(),
                self.local_number.as_deref(),
                self.extension.as_deref(),
            ],
            delims,
        )
    }
}

/// `EI` - entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ei {
    pub entity_identifier: Option<String>,
    pub namespace_id: Option<String>,
    pub universal_id: Option<String>,
    pub universal_id_type: Option<String>,
}

impl Ei {
    pub fn parse(raw: &str, delims: &Separators) -> Ei {
        let mut parts = split_components(raw, delims);
        Ei {
            entity_identifier: take(&mut parts, 0),
            namespace_id: take(&mut parts, 1),
            universal_id: take(&mut parts, 2),
            universal_id_type: take(&mut parts, 3),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        join_components(
            &[
                self.entity_identifier.as_deref(),
                self.namespace_id.as_deref(),
                self.universal_id.as_deref(),
                self.universal_id_type.as_deref(),
            ],
            delims,
        )
    }
}

/// `PL` - person location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pl {
    pub point_of_care: Option<String>,
    pub room: Option<String>,
    pub bed: Option<String>,
    pub facility: Option<Hd>,
    pub location_status: Option<String>,
    pub person_location_type: Option<String>,
    pub building: Option<String>,
    pub floor: Option<String>,
}

impl Pl {
    pub fn parse(raw: &str, delims: &Separators) -> Pl {
        let components: Vec<&str> = raw.split(delims.component).collect();
        let decoder = EscapeSequence::new(*delims);
        let text = |i: usize| -> Option<String> {
            components
                .get(i)
                .filter(|c| !c.is_empty())
                .map(|c| decoder.decode(*c).into_owned())
        };
        Pl {
            point_of_care: text(0),
            room: text(1),
            bed: text(2),
            facility: components
                .get(3)
                .filter(|c| !c.is_empty())
                .map(|c| Hd::parse(c, delims)),
            location_status: text(4),
            person_location_type: text(5),
            building: text(6),
            floor: text(7),
        }
    }

    pub fn format(&self, delims: &Separators) -> String {
        let encoder = EscapeSequence::new(*delims);
        let parts: [Option<String>; 8] = [
            self.point_of_care.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.room.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.bed.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.facility.as_ref().map(|h| h.format(delims)),
            self.location_status.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.person_location_type.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.building.as_deref().map(|t| encoder.encode(t).into_owned()),
            self.floor.as_deref().map(|t| encoder.encode(t).into_owned()),
        ];
        let last = parts.iter().rposition(|p| p.is_some()).map(|i| i + 1).unwrap_or(0);
        let mut out = String::new();
        for (i, part) in parts.iter().take(last).enumerate() {
            if i > 0 {
                out.push(delims.component);
            }
            if let Some(text) = part {
                out.push_str(text);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> Separators {
        Separators::default()
    }

    #[test]
    fn xpn_composes_in_standard_order() {
        let name = Xpn::parse("Doe^John^Q^Jr^Dr", &d());
        assert_eq!(name.family_name.as_deref(), Some("Doe"));
        assert_eq!(name.given_name.as_deref(), Some("John"));
        assert_eq!(name.middle_name.as_deref(), Some("Q"));
        assert_eq!(name.suffix.as_deref(), Some("Jr"));
        assert_eq!(name.prefix.as_deref(), Some("Dr"));
        assert_eq!(name.format(&d()), "Doe^John^Q^Jr^Dr");
    }

    #[test]
    fn cx_carries_a_nested_hierarchic_designator() {
        let cx = Cx::parse("MRN123^^^Hospital&1.2.3&ISO^MR", &d());
        assert_eq!(cx.id_number.as_deref(), Some("MRN123"));
        let authority = cx.assigning_authority.as_ref().unwrap();
        assert_eq!(authority.namespace_id.as_deref(), Some("Hospital"));
        assert_eq!(authority.universal_id.as_deref(), Some("1.2.3"));
        assert_eq!(authority.universal_id_type.as_deref(), Some("ISO"));
        assert_eq!(cx.identifier_type_code.as_deref(), Some("MR"));
        assert_eq!(cx.format(&d()), "MRN123^^^Hospital&1.2.3&ISO^MR");
    }

    #[test]
    fn ce_round_trips() {
        let wire = "1554-5^GLUCOSE^LN";
        let ce = Ce::parse(wire, &d());
        assert_eq!(ce.identifier.as_deref(), Some("1554-5"));
        assert_eq!(ce.coding_system.as_deref(), Some("LN"));
        assert_eq!(ce.format(&d()), wire);
    }

    #[test]
    fn escaped_text_decodes_inside_components() {
        let ce = Ce::parse(r#"1^Obstetrician \T\ Gynaecologist"#, &d());
        assert_eq!(ce.text.as_deref(), Some("Obstetrician & Gynaecologist"));
        assert_eq!(ce.format(&d()), r#"1^Obstetrician \T\ Gynaecologist"#);
    }

    #[test]
    fn trailing_empties_are_trimmed_on_format() {
        let xad = Xad::parse("153 FERNWOOD DR.^^STATESVILLE^OH^35292", &d());
        assert_eq!(xad.city.as_deref(), Some("STATESVILLE"));
        assert_eq!(xad.format(&d()), "153 FERNWOOD DR.^^STATESVILLE^OH^35292");
    }

    #[test]
    fn pl_formats_nested_facility() {
        let pl = Pl::parse("ICU^2^B^GeneralHospital", &d());
        assert_eq!(pl.point_of_care.as_deref(), Some("ICU"));
        assert_eq!(pl.facility.as_ref().unwrap().namespace_id.as_deref(), Some("GeneralHospital"));
        assert_eq!(pl.format(&d()), "ICU^2^B^GeneralHospital");
    }

    #[test]
    fn ei_and_hd_round_trip() {
        let ei = Ei::parse("845439^GHH OE", &d());
        assert_eq!(ei.entity_identifier.as_deref(), Some("845439"));
        assert_eq!(ei.format(&d()), "845439^GHH OE");

        let hd = Hd::parse("Hospital&1.2.3&ISO", &d());
        assert_eq!(hd.format(&d()), "Hospital&1.2.3&ISO");
    }

    #[test]
    fn xtn_exposes_email() {
        let xtn = Xtn::parse("^NET^Internet^jdoe@example.org", &d());
        assert_eq!(xtn.email_address.as_deref(), Some("jdoe@example.org"));
        assert_eq!(xtn.format(&d()), "^NET^Internet^jdoe@example.org");
    }
}
