//! Per-version message-group schemas.

use super::{Cardinality, MessageStructure, StructureItem, Usage, Version};

const fn seg(id: &'static str, usage: Usage, cardinality: Cardinality) -> StructureItem {
    StructureItem::Segment { id, usage, cardinality }
}

use Usage::{Optional, Required};

const ONCE: Cardinality = Cardinality::once();
const OPT: Cardinality = Cardinality::optional();
const MANY: Cardinality = Cardinality::many();
const SOME: Cardinality = Cardinality::at_least_one();

// -------------------------------------------------------------- ACK ----

static ACK_ITEMS: [StructureItem; 3] = [
    seg("MSH", Required, ONCE),
    seg("MSA", Required, ONCE),
    seg("ERR", Optional, MANY),
];

static ACK: MessageStructure = MessageStructure {
    id: "ACK",
    message_type: "ACK",
    trigger_event: "",
    items: &ACK_ITEMS,
};

// ---------------------------------------------------------- ADT_A01 ----

static ADT_A01_ITEMS: [StructureItem; 8] = [
    seg("MSH", Required, ONCE),
    seg("EVN", Required, ONCE),
    seg("PID", Required, ONCE),
    seg("NK1", Optional, MANY),
    seg("PV1", Required, ONCE),
    seg("OBX", Optional, MANY),
    seg("AL1", Optional, MANY),
    seg("DG1", Optional, MANY),
];

static ADT_A01: MessageStructure = MessageStructure {
    id: "ADT_A01",
    message_type: "ADT",
    trigger_event: "A01",
    items: &ADT_A01_ITEMS,
};

// ---------------------------------------------------------- ORU_R01 ----

static ORU_OBSERVATION: [StructureItem; 2] = [
    seg("OBX", Required, ONCE),
    seg("NTE", Optional, MANY),
];

static ORU_ORDER_OBSERVATION: [StructureItem; 4] = [
    seg("ORC", Optional, OPT),
    seg("OBR", Required, ONCE),
    seg("NTE", Optional, MANY),
    StructureItem::Group {
        name: "OBSERVATION",
        cardinality: MANY,
        items: &ORU_OBSERVATION,
    },
];

static ORU_PATIENT: [StructureItem; 3] = [
    seg("PID", Required, ONCE),
    seg("NTE", Optional, MANY),
    seg("PV1", Optional, OPT),
];

static ORU_PATIENT_RESULT: [StructureItem; 2] = [
    StructureItem::Group {
        name: "PATIENT",
        cardinality: OPT,
        items: &ORU_PATIENT,
    },
    StructureItem::Group {
        name: "ORDER_OBSERVATION",
        cardinality: SOME,
        items: &ORU_ORDER_OBSERVATION,
    },
];

static ORU_R01_ITEMS: [StructureItem; 2] = [
    seg("MSH", Required, ONCE),
    StructureItem::Group {
        name: "PATIENT_RESULT",
        cardinality: SOME,
        items: &ORU_PATIENT_RESULT,
    },
];

static ORU_R01: MessageStructure = MessageStructure {
    id: "ORU_R01",
    message_type: "ORU",
    trigger_event: "R01",
    items: &ORU_R01_ITEMS,
};

// ---------------------------------------------------------- ORM_O01 ----

static ORM_PATIENT: [StructureItem; 3] = [
    seg("PID", Required, ONCE),
    seg("NTE", Optional, MANY),
    seg("PV1", Optional, OPT),
];

static ORM_ORDER: [StructureItem; 3] = [
    seg("ORC", Required, ONCE),
    seg("OBR", Optional, OPT),
    seg("NTE", Optional, MANY),
];

static ORM_O01_ITEMS: [StructureItem; 4] = [
    seg("MSH", Required, ONCE),
    seg("NTE", Optional, MANY),
    StructureItem::Group {
        name: "PATIENT",
        cardinality: OPT,
        items: &ORM_PATIENT,
    },
    StructureItem::Group {
        name: "ORDER",
        cardinality: SOME,
        items: &ORM_ORDER,
    },
];

static ORM_O01: MessageStructure = MessageStructure {
    id: "ORM_O01",
    message_type: "ORM",
    trigger_event: "O01",
    items: &ORM_O01_ITEMS,
};

static V2_1_STRUCTURES: [MessageStructure; 1] = [ACK];
static V2_3_STRUCTURES: [MessageStructure; 3] = [ADT_A01, ORU_R01, ORM_O01];

pub(crate) fn catalog(version: Version) -> &'static [MessageStructure] {
    match version {
        Version::V2_1 => &V2_1_STRUCTURES,
        Version::V2_3 => &V2_3_STRUCTURES,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::message_structure;

    #[test]
    fn ack_matches_any_trigger() {
        let (structure, found) = message_structure(Version::V2_5, "ACK", "").unwrap();
        assert_eq!(structure.id, "ACK");
        assert_eq!(found, Version::V2_1);
    }

    #[test]
    fn adt_a01_resolves_with_fallback() {
        let (structure, found) = message_structure(Version::V2_5_1, "ADT", "A01").unwrap();
        assert_eq!(structure.id, "ADT_A01");
        assert_eq!(found, Version::V2_3);
    }

    #[test]
    fn oru_r01_nests_groups() {
        let (structure, _) = message_structure(Version::V2_4, "ORU", "R01").unwrap();
        match &structure.items[1] {
            StructureItem::Group { name, items, .. } => {
                assert_eq!(*name, "PATIENT_RESULT");
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected a group, got {:?}", other),
        }
    }

    #[test]
    fn unknown_structures_resolve_to_nothing() {
        assert!(message_structure(Version::V2_8, "XYZ", "Z99").is_none());
    }
}
