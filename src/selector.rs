/*!
The selector functionality provides the ability to query into an HL7 message
and select individual values using a path notation.

Paths name a segment, then optionally a field, repetition, component and
subcomponent: `PID.F3`, `MSH.F9.C2`, `OBX.F5.R2.C1.S2`.  A second segment
occurrence can be addressed with an index suffix: `OBX[2].F5`.

## Example
```
# use hl7v2_core::Hl7ParseError;
# use hl7v2_core::message::Message;
# use hl7v2_core::selector;
# use std::convert::TryFrom;
# fn main() -> Result<(), Hl7ParseError> {
let msg = Message::try_from("MSH|^~\\&|GHH LAB|ELAB-3|GHH OE|BLDG4|200202150930||ORU^R01|CNTRL-3456|P|2.4")?;
let val = selector::query(&msg, "MSH.F3"); // MSH segment, field 3
assert_eq!(val.as_deref(), Some("GHH LAB"));
# Ok(())
# }
```
*/

use crate::fields::Presence;
use crate::message::Message;

/// Access segment, field, or sub-field values by string path.  Returns the
/// raw wire text of the addressed node, or `None` when any step of the
/// path is absent.
pub fn query(msg: &Message, path: &str) -> Option<String> {
    let delims = msg.separators();
    let mut steps = path.split('.');

    let (segment_id, occurrence) = parse_segment_step(steps.next()?)?;
    let segments = msg.segments_by_id(&segment_id);
    let segment = segments.get(occurrence.saturating_sub(1)).copied()?;

    let field = match steps.next() {
        Some(step) => step,
        None => return Some(segment.to_wire(delims)),
    };
    let field = match segment.field(index_of(field, 'F')?) {
        Presence::Present(f) => f,
        Presence::Empty => return Some(String::new()),
        Presence::Absent => return None,
    };

    // An explicit repetition step is optional; without one the first
    // repetition is addressed, matching how analysts read paths.
    let mut next = steps.next();
    let repetition = match next {
        Some(step) if step.starts_with('R') => {
            let idx = index_of(step, 'R')?;
            next = steps.next();
            match field.repetition(idx) {
                Presence::Present(r) => r,
                Presence::Empty => return Some(String::new()),
                Presence::Absent => return None,
            }
        }
        _ => field.first(),
    };

    let component = match next {
        Some(step) => step,
        None => return Some(repetition.raw(delims)),
    };
    let component = match repetition.component(index_of(component, 'C')?) {
        Presence::Present(c) => c,
        Presence::Empty => return Some(String::new()),
        Presence::Absent => return None,
    };

    let subcomponent = match steps.next() {
        Some(step) => step,
        None => return Some(component.raw(delims)),
    };
    match component.subcomponent(index_of(subcomponent, 'S')?) {
        Presence::Present(s) => Some(s.raw().to_string()),
        Presence::Empty => Some(String::new()),
        Presence::Absent => None,
    }
}

/// `PID` -> ("PID", 1); `OBX[2]` -> ("OBX", 2).
fn parse_segment_step(step: &str) -> Option<(String, usize)> {
    match step.find('[') {
        Some(open) => {
            let close = step.find(']')?;
            let id = &step[..open];
            let occurrence: usize = step[open + 1..close].parse().ok()?;
            if occurrence == 0 {
                return None;
            }
            Some((id.to_string(), occurrence))
        }
        None => Some((step.to_string(), 1)),
    }
}

/// Strip the leading letter tag (`F3` -> 3); a bare number is accepted too.
fn index_of(step: &str, tag: char) -> Option<usize> {
    let digits = step.strip_prefix(tag).unwrap_or(step);
    let idx: usize = digits.parse().ok()?;
    if idx == 0 {
        None
    } else {
        Some(idx)
    }
}
