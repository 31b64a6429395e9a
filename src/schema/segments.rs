//! Per-version segment definition catalogs.
//!
//! Only the versions that changed a table ship a catalog; the point
//! releases in between resolve through the fallback chain in the parent
//! module.  Field tables are the commonly-exchanged prefix of each
//! segment; trailing rarely-used positions are omitted and validate as
//! unconstrained.

use super::{BindingStrength, Cardinality, FieldDef, SegmentDef, TableBinding, Usage, Version};

const fn field(
    name: &'static str,
    datatype: &'static str,
    usage: Usage,
    cardinality: Cardinality,
    max_length: u32,
) -> FieldDef {
    FieldDef {
        name,
        datatype,
        usage,
        cardinality,
        max_length,
        binding: None,
    }
}

const fn coded(
    name: &'static str,
    datatype: &'static str,
    usage: Usage,
    cardinality: Cardinality,
    max_length: u32,
    table: u16,
    strength: BindingStrength,
) -> FieldDef {
    FieldDef {
        name,
        datatype,
        usage,
        cardinality,
        max_length,
        binding: Some(TableBinding { table, strength }),
    }
}

use BindingStrength::{Extensible, Required as Req};
use Usage::{Backward, Conditional, Optional, Required};

const ONCE: Cardinality = Cardinality::once();
const OPT: Cardinality = Cardinality::optional();
const MANY: Cardinality = Cardinality::many();
const SOME: Cardinality = Cardinality::at_least_one();

// ---------------------------------------------------------------- v2.1 --

static MSH_2_1: [FieldDef; 14] = [
    field("Field Separator", "ST", Required, ONCE, 1),
    field("Encoding Characters", "ST", Required, ONCE, 4),
    field("Sending Application", "ST", Optional, OPT, 180),
    field("Sending Facility", "ST", Optional, OPT, 180),
    field("Receiving Application", "ST", Optional, OPT, 180),
    field("Receiving Facility", "ST", Optional, OPT, 180),
    field("Date/Time Of Message", "TS", Optional, OPT, 19),
    field("Security", "ST", Optional, OPT, 40),
    coded("Message Type", "CM", Required, ONCE, 7, 76, Req),
    field("Message Control ID", "ST", Required, ONCE, 20),
    coded("Processing ID", "ID", Required, ONCE, 1, 103, Req),
    coded("Version ID", "NM", Required, ONCE, 8, 104, Req),
    field("Sequence Number", "NM", Optional, OPT, 15),
    field("Continuation Pointer", "ST", Optional, OPT, 180),
];

static EVN_2_1: [FieldDef; 4] = [
    coded("Event Type Code", "ID", Required, ONCE, 3, 3, Req),
    field("Recorded Date/Time", "TS", Required, ONCE, 19),
    field("Date/Time Planned Event", "TS", Optional, OPT, 19),
    field("Event Reason Code", "ID", Optional, OPT, 3),
];

static PID_2_1: [FieldDef; 11] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Patient ID External", "CK", Optional, OPT, 16),
    field("Patient ID Internal", "CK", Required, ONCE, 20),
    field("Alternate Patient ID", "ST", Optional, OPT, 12),
    field("Patient Name", "PN", Required, ONCE, 48),
    field("Mother's Maiden Name", "ST", Optional, OPT, 30),
    field("Date of Birth", "DT", Optional, OPT, 8),
    coded("Sex", "ID", Optional, OPT, 1, 1, Req),
    field("Patient Alias", "PN", Optional, MANY, 48),
    field("Race", "ID", Optional, OPT, 1),
    field("Patient Address", "AD", Optional, OPT, 106),
];

static MSA_2_1: [FieldDef; 6] = [
    coded("Acknowledgment Code", "ID", Required, ONCE, 2, 8, Req),
    field("Message Control ID", "ST", Required, ONCE, 20),
    field("Text Message", "ST", Optional, OPT, 80),
    field("Expected Sequence Number", "NM", Optional, OPT, 15),
    field("Delayed Acknowledgment Type", "ID", Optional, OPT, 1),
    field("Error Condition", "ID", Optional, OPT, 10),
];

static NTE_2_1: [FieldDef; 3] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Source of Comment", "ID", Optional, OPT, 8),
    field("Comment", "TX", Optional, MANY, 120),
];

static OBX_2_1: [FieldDef; 12] = [
    field("Set ID", "SI", Optional, OPT, 4),
    coded("Value Type", "ID", Conditional, OPT, 3, 125, Req),
    field("Observation Identifier", "CE", Required, ONCE, 80),
    field("Observation Sub-ID", "NM", Conditional, OPT, 20),
    field("Observation Value", "ST", Conditional, MANY, 65536),
    field("Units", "ID", Optional, OPT, 20),
    field("References Range", "ST", Optional, OPT, 60),
    field("Abnormal Flags", "ID", Optional, MANY, 5),
    field("Probability", "NM", Optional, OPT, 5),
    field("Nature of Abnormal Test", "ID", Optional, OPT, 2),
    coded("Observation Result Status", "ID", Optional, OPT, 1, 85, Req),
    field("Date of Last Normal Values", "TS", Optional, OPT, 19),
];

static V2_1_SEGMENTS: [SegmentDef; 6] = [
    SegmentDef { id: "MSH", fields: &MSH_2_1 },
    SegmentDef { id: "EVN", fields: &EVN_2_1 },
    SegmentDef { id: "PID", fields: &PID_2_1 },
    SegmentDef { id: "MSA", fields: &MSA_2_1 },
    SegmentDef { id: "NTE", fields: &NTE_2_1 },
    SegmentDef { id: "OBX", fields: &OBX_2_1 },
];

// ---------------------------------------------------------------- v2.3 --

static OBR_2_3: [FieldDef; 16] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Placer Order Number", "EI", Conditional, OPT, 22),
    field("Filler Order Number", "EI", Conditional, OPT, 22),
    field("Universal Service ID", "CE", Required, ONCE, 200),
    field("Priority", "ID", Backward, OPT, 2),
    field("Requested Date/Time", "TS", Backward, OPT, 26),
    field("Observation Date/Time", "TS", Conditional, OPT, 26),
    field("Observation End Date/Time", "TS", Optional, OPT, 26),
    field("Collection Volume", "CQ", Optional, OPT, 20),
    field("Collector Identifier", "XCN", Optional, MANY, 60),
    field("Specimen Action Code", "ID", Optional, OPT, 1),
    field("Danger Code", "CE", Optional, OPT, 60),
    field("Relevant Clinical Info", "ST", Optional, OPT, 300),
    field("Specimen Received Date/Time", "TS", Conditional, OPT, 26),
    field("Specimen Source", "CM", Optional, OPT, 300),
    field("Ordering Provider", "XCN", Optional, MANY, 120),
];

static ORC_2_3: [FieldDef; 10] = [
    field("Order Control", "ID", Required, ONCE, 2),
    field("Placer Order Number", "EI", Conditional, OPT, 22),
    field("Filler Order Number", "EI", Conditional, OPT, 22),
    field("Placer Group Number", "EI", Optional, OPT, 22),
    field("Order Status", "ID", Optional, OPT, 2),
    field("Response Flag", "ID", Optional, OPT, 1),
    field("Quantity/Timing", "TQ", Optional, MANY, 200),
    field("Parent", "CM", Optional, OPT, 200),
    field("Date/Time of Transaction", "TS", Optional, OPT, 26),
    field("Entered By", "XCN", Optional, OPT, 120),
];

static PV1_2_3: [FieldDef; 10] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Patient Class", "IS", Required, ONCE, 1),
    field("Assigned Patient Location", "PL", Optional, OPT, 80),
    field("Admission Type", "IS", Optional, OPT, 2),
    field("Preadmit Number", "CX", Optional, OPT, 20),
    field("Prior Patient Location", "PL", Optional, OPT, 80),
    field("Attending Doctor", "XCN", Optional, MANY, 60),
    field("Referring Doctor", "XCN", Optional, MANY, 60),
    field("Consulting Doctor", "XCN", Optional, MANY, 60),
    field("Hospital Service", "IS", Optional, OPT, 3),
];

static AL1_2_3: [FieldDef; 6] = [
    field("Set ID", "SI", Required, ONCE, 4),
    field("Allergy Type", "IS", Optional, OPT, 2),
    field("Allergy Code/Mnemonic/Description", "CE", Required, ONCE, 60),
    field("Allergy Severity", "IS", Optional, OPT, 2),
    field("Allergy Reaction", "ST", Optional, MANY, 15),
    field("Identification Date", "DT", Optional, OPT, 8),
];

static DG1_2_3: [FieldDef; 6] = [
    field("Set ID", "SI", Required, ONCE, 4),
    field("Diagnosis Coding Method", "ID", Backward, OPT, 2),
    field("Diagnosis Code", "CE", Optional, OPT, 60),
    field("Diagnosis Description", "ST", Backward, OPT, 40),
    field("Diagnosis Date/Time", "TS", Optional, OPT, 26),
    field("Diagnosis Type", "IS", Required, ONCE, 2),
];

static PID_2_3: [FieldDef; 19] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Patient ID External", "CX", Backward, OPT, 16),
    field("Patient ID Internal", "CX", Required, SOME, 20),
    field("Alternate Patient ID", "CX", Backward, OPT, 20),
    field("Patient Name", "XPN", Required, SOME, 48),
    field("Mother's Maiden Name", "XPN", Optional, OPT, 48),
    field("Date/Time of Birth", "TS", Optional, OPT, 26),
    coded("Sex", "IS", Optional, OPT, 1, 1, Req),
    field("Patient Alias", "XPN", Backward, MANY, 48),
    field("Race", "IS", Optional, OPT, 1),
    field("Patient Address", "XAD", Optional, MANY, 106),
    field("County Code", "IS", Backward, OPT, 4),
    field("Phone Number - Home", "XTN", Optional, MANY, 40),
    field("Phone Number - Business", "XTN", Optional, MANY, 40),
    field("Primary Language", "CE", Optional, OPT, 60),
    field("Marital Status", "IS", Optional, OPT, 1),
    field("Religion", "IS", Optional, OPT, 3),
    field("Patient Account Number", "CX", Optional, OPT, 20),
    field("SSN Number", "ST", Backward, OPT, 16),
];

static V2_3_SEGMENTS: [SegmentDef; 6] = [
    SegmentDef { id: "OBR", fields: &OBR_2_3 },
    SegmentDef { id: "ORC", fields: &ORC_2_3 },
    SegmentDef { id: "PV1", fields: &PV1_2_3 },
    SegmentDef { id: "AL1", fields: &AL1_2_3 },
    SegmentDef { id: "DG1", fields: &DG1_2_3 },
    SegmentDef { id: "PID", fields: &PID_2_3 },
];

// ---------------------------------------------------------------- v2.5 --

static MSH_2_5: [FieldDef; 21] = [
    field("Field Separator", "ST", Required, ONCE, 1),
    field("Encoding Characters", "ST", Required, ONCE, 4),
    field("Sending Application", "HD", Optional, OPT, 227),
    field("Sending Facility", "HD", Optional, OPT, 227),
    field("Receiving Application", "HD", Optional, OPT, 227),
    field("Receiving Facility", "HD", Optional, OPT, 227),
    field("Date/Time Of Message", "TS", Required, ONCE, 26),
    field("Security", "ST", Optional, OPT, 40),
    coded("Message Type", "MSG", Required, ONCE, 15, 76, Req),
    field("Message Control ID", "ST", Required, ONCE, 20),
    coded("Processing ID", "PT", Required, ONCE, 3, 103, Req),
    coded("Version ID", "VID", Required, ONCE, 60, 104, Req),
    field("Sequence Number", "NM", Optional, OPT, 15),
    field("Continuation Pointer", "ST", Optional, OPT, 180),
    field("Accept Acknowledgment Type", "ID", Optional, OPT, 2),
    field("Application Acknowledgment Type", "ID", Optional, OPT, 2),
    field("Country Code", "ID", Optional, OPT, 3),
    field("Character Set", "ID", Optional, MANY, 16),
    field("Principal Language Of Message", "CE", Optional, OPT, 250),
    field("Alternate Character Set Handling Scheme", "ID", Optional, OPT, 20),
    field("Message Profile Identifier", "EI", Optional, MANY, 427),
];

static EVN_2_5: [FieldDef; 7] = [
    coded("Event Type Code", "ID", Backward, OPT, 3, 3, Req),
    field("Recorded Date/Time", "TS", Required, ONCE, 26),
    field("Date/Time Planned Event", "TS", Optional, OPT, 26),
    field("Event Reason Code", "IS", Optional, OPT, 3),
    field("Operator ID", "XCN", Optional, MANY, 250),
    field("Event Occurred", "TS", Optional, OPT, 26),
    field("Event Facility", "HD", Optional, OPT, 241),
];

static PID_2_5: [FieldDef; 20] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Patient ID", "CX", Backward, OPT, 20),
    field("Patient Identifier List", "CX", Required, SOME, 250),
    field("Alternate Patient ID", "CX", Backward, MANY, 20),
    field("Patient Name", "XPN", Required, SOME, 250),
    field("Mother's Maiden Name", "XPN", Optional, MANY, 250),
    field("Date/Time of Birth", "TS", Optional, OPT, 26),
    coded("Administrative Sex", "IS", Optional, OPT, 1, 1, Req),
    field("Patient Alias", "XPN", Backward, MANY, 250),
    field("Race", "CE", Optional, MANY, 250),
    field("Patient Address", "XAD", Optional, MANY, 250),
    field("County Code", "IS", Backward, OPT, 4),
    field("Phone Number - Home", "XTN", Optional, MANY, 250),
    field("Phone Number - Business", "XTN", Optional, MANY, 250),
    field("Primary Language", "CE", Optional, OPT, 250),
    field("Marital Status", "CE", Optional, OPT, 250),
    field("Religion", "CE", Optional, OPT, 250),
    field("Patient Account Number", "CX", Optional, OPT, 250),
    field("SSN Number", "ST", Backward, OPT, 16),
    field("Driver's License Number", "DLN", Backward, OPT, 25),
];

static OBX_2_5: [FieldDef; 17] = [
    field("Set ID", "SI", Optional, OPT, 4),
    coded("Value Type", "ID", Conditional, OPT, 2, 125, Req),
    field("Observation Identifier", "CE", Required, ONCE, 250),
    field("Observation Sub-ID", "ST", Conditional, OPT, 20),
    field("Observation Value", "ST", Conditional, MANY, 99999),
    field("Units", "CE", Optional, OPT, 250),
    field("References Range", "ST", Optional, OPT, 60),
    coded("Abnormal Flags", "IS", Optional, MANY, 5, 78, Extensible),
    field("Probability", "NM", Optional, OPT, 5),
    field("Nature of Abnormal Test", "ID", Optional, MANY, 2),
    coded("Observation Result Status", "ID", Required, ONCE, 1, 85, Req),
    field("Effective Date of Reference Range", "TS", Optional, OPT, 26),
    field("User Defined Access Checks", "ST", Optional, OPT, 20),
    field("Date/Time of the Observation", "TS", Optional, OPT, 26),
    field("Producer's ID", "CE", Optional, OPT, 250),
    field("Responsible Observer", "XCN", Optional, MANY, 250),
    field("Observation Method", "CE", Optional, MANY, 250),
];

static MSA_2_5: [FieldDef; 6] = [
    coded("Acknowledgment Code", "ID", Required, ONCE, 2, 8, Req),
    field("Message Control ID", "ST", Required, ONCE, 20),
    field("Text Message", "ST", Backward, OPT, 80),
    field("Expected Sequence Number", "NM", Optional, OPT, 15),
    field("Delayed Acknowledgment Type", "ID", Backward, OPT, 1),
    field("Error Condition", "CE", Backward, OPT, 250),
];

static NTE_2_5: [FieldDef; 4] = [
    field("Set ID", "SI", Optional, OPT, 4),
    field("Source of Comment", "ID", Optional, OPT, 8),
    field("Comment", "FT", Optional, MANY, 65536),
    field("Comment Type", "CE", Optional, OPT, 250),
];

static BHS_2_5: [FieldDef; 12] = [
    field("Batch Field Separator", "ST", Required, ONCE, 1),
    field("Batch Encoding Characters", "ST", Required, ONCE, 4),
    field("Batch Sending Application", "HD", Optional, OPT, 227),
    field("Batch Sending Facility", "HD", Optional, OPT, 227),
    field("Batch Receiving Application", "HD", Optional, OPT, 227),
    field("Batch Receiving Facility", "HD", Optional, OPT, 227),
    field("Batch Creation Date/Time", "TS", Optional, OPT, 26),
    field("Batch Security", "ST", Optional, OPT, 40),
    field("Batch Name/ID/Type", "ST", Optional, OPT, 20),
    field("Batch Comment", "ST", Optional, OPT, 80),
    field("Batch Control ID", "ST", Optional, OPT, 20),
    field("Reference Batch Control ID", "ST", Optional, OPT, 20),
];

static BTS_2_5: [FieldDef; 3] = [
    field("Batch Message Count", "ST", Optional, OPT, 10),
    field("Batch Comment", "ST", Optional, OPT, 80),
    field("Batch Totals", "NM", Optional, MANY, 100),
];

static FHS_2_5: [FieldDef; 12] = [
    field("File Field Separator", "ST", Required, ONCE, 1),
    field("File Encoding Characters", "ST", Required, ONCE, 4),
    field("File Sending Application", "HD", Optional, OPT, 227),
    field("File Sending Facility", "HD", Optional, OPT, 227),
    field("File Receiving Application", "HD", Optional, OPT, 227),
    field("File Receiving Facility", "HD", Optional, OPT, 227),
    field("File Creation Date/Time", "TS", Optional, OPT, 26),
    field("File Security", "ST", Optional, OPT, 40),
    field("File Name/ID", "ST", Optional, OPT, 20),
    field("File Header Comment", "ST", Optional, OPT, 80),
    field("File Control ID", "ST", Optional, OPT, 20),
    field("Reference File Control ID", "ST", Optional, OPT, 20),
];

static FTS_2_5: [FieldDef; 2] = [
    field("File Batch Count", "NM", Optional, OPT, 10),
    field("File Trailer Comment", "ST", Optional, OPT, 80),
];

static ERR_2_5: [FieldDef; 5] = [
    field("Error Code and Location", "ELD", Backward, MANY, 493),
    field("Error Location", "ERL", Optional, MANY, 18),
    field("HL7 Error Code", "CWE", Required, ONCE, 705),
    field("Severity", "ID", Required, ONCE, 2),
    field("Application Error Code", "CWE", Optional, OPT, 705),
];

static NK1_2_5: [FieldDef; 5] = [
    field("Set ID", "SI", Required, ONCE, 4),
    field("Name", "XPN", Optional, MANY, 250),
    field("Relationship", "CE", Optional, OPT, 250),
    field("Address", "XAD", Optional, MANY, 250),
    field("Phone Number", "XTN", Optional, MANY, 250),
];

static V2_5_SEGMENTS: [SegmentDef; 13] = [
    SegmentDef { id: "MSH", fields: &MSH_2_5 },
    SegmentDef { id: "EVN", fields: &EVN_2_5 },
    SegmentDef { id: "PID", fields: &PID_2_5 },
    SegmentDef { id: "OBX", fields: &OBX_2_5 },
    SegmentDef { id: "MSA", fields: &MSA_2_5 },
    SegmentDef { id: "NTE", fields: &NTE_2_5 },
    SegmentDef { id: "BHS", fields: &BHS_2_5 },
    SegmentDef { id: "BTS", fields: &BTS_2_5 },
    SegmentDef { id: "FHS", fields: &FHS_2_5 },
    SegmentDef { id: "FTS", fields: &FTS_2_5 },
    SegmentDef { id: "ERR", fields: &ERR_2_5 },
    SegmentDef { id: "NK1", fields: &NK1_2_5 },
    SegmentDef { id: "ORC", fields: &ORC_2_3 },
];

// ---------------------------------------------------------------- v2.7 --

static MSH_2_7: [FieldDef; 25] = [
    field("Field Separator", "ST", Required, ONCE, 1),
    field("Encoding Characters", "ST", Required, ONCE, 5),
    field("Sending Application", "HD", Optional, OPT, 227),
    field("Sending Facility", "HD", Optional, OPT, 227),
    field("Receiving Application", "HD", Optional, OPT, 227),
    field("Receiving Facility", "HD", Optional, OPT, 227),
    field("Date/Time Of Message", "DTM", Required, ONCE, 24),
    field("Security", "ST", Optional, OPT, 40),
    coded("Message Type", "MSG", Required, ONCE, 15, 76, Req),
    field("Message Control ID", "ST", Required, ONCE, 199),
    coded("Processing ID", "PT", Required, ONCE, 3, 103, Req),
    coded("Version ID", "VID", Required, ONCE, 973, 104, Req),
    field("Sequence Number", "NM", Optional, OPT, 15),
    field("Continuation Pointer", "ST", Optional, OPT, 180),
    field("Accept Acknowledgment Type", "ID", Optional, OPT, 2),
    field("Application Acknowledgment Type", "ID", Optional, OPT, 2),
    field("Country Code", "ID", Optional, OPT, 3),
    field("Character Set", "ID", Optional, MANY, 16),
    field("Principal Language Of Message", "CWE", Optional, OPT, 250),
    field("Alternate Character Set Handling Scheme", "ID", Optional, OPT, 20),
    field("Message Profile Identifier", "EI", Optional, MANY, 427),
    field("Sending Responsible Organization", "XON", Optional, OPT, 567),
    field("Receiving Responsible Organization", "XON", Optional, OPT, 567),
    field("Sending Network Address", "HD", Optional, OPT, 227),
    field("Receiving Network Address", "HD", Optional, OPT, 227),
];

static V2_7_SEGMENTS: [SegmentDef; 1] = [SegmentDef { id: "MSH", fields: &MSH_2_7 }];

pub(crate) fn catalog(version: Version) -> &'static [SegmentDef] {
    match version {
        Version::V2_1 => &V2_1_SEGMENTS,
        Version::V2_3 => &V2_3_SEGMENTS,
        Version::V2_5 => &V2_5_SEGMENTS,
        Version::V2_7 => &V2_7_SEGMENTS,
        _ => &[],
    }
}
