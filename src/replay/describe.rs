use crate::trace::{TraceAction, TraceEvent};

/// One-line natural-language account of a single event, for the step readout.
///
/// `previous` is the value the event overwrites, when the caller knows it;
/// updates are then phrased as a transition instead of a bare assignment.
pub(crate) fn describe(event: &TraceEvent, previous: Option<&str>) -> String {
    match event {
        TraceEvent::Func { name, action, .. } => match action {
            TraceAction::Enter => format!("entered function {name}"),
            TraceAction::Exit => format!("returned from {name}"),
        },
        TraceEvent::Scope { scope_type, action, .. } => match action {
            TraceAction::Enter => format!("entered {scope_type} block"),
            TraceAction::Exit => format!("left {scope_type} block"),
        },
        TraceEvent::Var { name, value, .. } => format!("declared {name} = {value}"),
        TraceEvent::Const { name, value, .. } => format!("declared constant {name} = {value}"),
        TraceEvent::Reference { name, value, .. } => format!("bound reference {name} = {value}"),
        TraceEvent::Assign { name, value, .. } => match previous {
            Some(old) if old != value => format!("updated {name}: {old} → {value}"),
            _ => format!("assigned {name} = {value}"),
        },
        TraceEvent::Pointer {
            name, value, deref, ..
        } => {
            if *deref {
                format!("wrote through pointer {name}")
            } else {
                match previous {
                    Some(old) => format!("repointed {name}: was {old}, now {value}"),
                    None => format!("declared pointer {name} → {value}"),
                }
            }
        }
        TraceEvent::Array { name, size, .. } => format!("declared array {name}[{size}]"),
        TraceEvent::Array2d {
            name, rows, cols, ..
        } => format!("declared array {name}[{rows}][{cols}]"),
        TraceEvent::Struct {
            name, struct_type, ..
        } => format!("declared {struct_type} {name}"),
        TraceEvent::Field {
            owner, field, value, ..
        } => match previous {
            Some(old) if old != value => format!("updated {owner}.{field}: {old} → {value}"),
            _ => format!("set {owner}.{field} = {value}"),
        },
        TraceEvent::HeapAlloc { name, .. } => format!("allocated heap block {name}"),
        TraceEvent::HeapArray { name, size, .. } => {
            format!("allocated heap array {name} of {size} elements")
        }
        TraceEvent::HeapFree { name, .. } => format!("freed heap block {name}"),
        TraceEvent::Unknown => "unrecognized event".to_string(),
    }
}
