use serde::{Deserialize, Serialize};

/// Marker token separating ordinary program output from trace payloads.
///
/// Any stdout line may contain it: text before the marker is real output,
/// text after it is exactly one JSON-encoded trace event.
pub const SENTINEL: &str = "@@MEMLENS@@";

/// One structured record describing a single observable state change
/// during program execution.
///
/// The instrumented program prints these as sentinel-prefixed JSON lines;
/// every variant carries the source line that produced it. All observed
/// values and addresses travel as strings because the target program
/// formats them itself (`%d`, `%p`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Function activation push/pop
    Func {
        line: u32,
        name: String,
        action: TraceAction,
    },

    /// Lexical block boundary (display-only, no data-model effect)
    Scope {
        line: u32,
        scope_type: String,
        action: TraceAction,
    },

    /// Scalar binding created
    Var {
        line: u32,
        name: String,
        value: String,
        addr: String,
    },

    /// Immutable scalar binding created
    Const {
        line: u32,
        name: String,
        value: String,
        addr: String,
    },

    /// Reference binding observed
    Reference {
        line: u32,
        name: String,
        value: String,
        addr: String,
    },

    /// Scalar binding updated; `name` may be an element (`a[2]`, `m[0][1]`)
    /// or a dereference (`*p`)
    Assign {
        line: u32,
        name: String,
        value: String,
    },

    /// Pointer binding created or updated; `value` is the target address
    Pointer {
        line: u32,
        name: String,
        addr: String,
        value: String,
        #[serde(default)]
        deref: bool,
    },

    /// Fixed-size 1-D array binding; `value` is comma-joined elements
    Array {
        line: u32,
        name: String,
        value: String,
        size: u32,
        addr: String,
    },

    /// Fixed-size 2-D array binding; `value` is row-major comma-joined
    Array2d {
        line: u32,
        name: String,
        value: String,
        rows: u32,
        cols: u32,
        addr: String,
    },

    /// Aggregate instance created (fields arrive separately)
    Struct {
        line: u32,
        name: String,
        struct_type: String,
        addr: String,
    },

    /// One aggregate field updated
    Field {
        line: u32,
        #[serde(rename = "struct")]
        owner: String,
        field: String,
        value: String,
        addr: String,
    },

    /// Single dynamic allocation
    HeapAlloc {
        line: u32,
        name: String,
        value: String,
        size: u32,
        addr: String,
    },

    /// Dynamic array allocation
    HeapArray {
        line: u32,
        name: String,
        value: String,
        size: u32,
        addr: String,
    },

    /// Dynamic allocation released
    HeapFree { line: u32, name: String, addr: String },

    /// Unrecognized kind (forward compatibility; never fatal)
    #[serde(other)]
    Unknown,
}

/// Enter/exit discriminator shared by `func` and `scope` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    Enter,
    Exit,
}

impl TraceEvent {
    /// Human-readable kind name for display and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            TraceEvent::Func { .. } => "func",
            TraceEvent::Scope { .. } => "scope",
            TraceEvent::Var { .. } => "var",
            TraceEvent::Const { .. } => "const",
            TraceEvent::Reference { .. } => "reference",
            TraceEvent::Assign { .. } => "assign",
            TraceEvent::Pointer { .. } => "pointer",
            TraceEvent::Array { .. } => "array",
            TraceEvent::Array2d { .. } => "array2d",
            TraceEvent::Struct { .. } => "struct",
            TraceEvent::Field { .. } => "field",
            TraceEvent::HeapAlloc { .. } => "heap_alloc",
            TraceEvent::HeapArray { .. } => "heap_array",
            TraceEvent::HeapFree { .. } => "heap_free",
            TraceEvent::Unknown => "unknown",
        }
    }

    /// Source line this event was emitted for (0 for unknown events)
    pub fn line(&self) -> u32 {
        match self {
            TraceEvent::Func { line, .. }
            | TraceEvent::Scope { line, .. }
            | TraceEvent::Var { line, .. }
            | TraceEvent::Const { line, .. }
            | TraceEvent::Reference { line, .. }
            | TraceEvent::Assign { line, .. }
            | TraceEvent::Pointer { line, .. }
            | TraceEvent::Array { line, .. }
            | TraceEvent::Array2d { line, .. }
            | TraceEvent::Struct { line, .. }
            | TraceEvent::Field { line, .. }
            | TraceEvent::HeapAlloc { line, .. }
            | TraceEvent::HeapArray { line, .. }
            | TraceEvent::HeapFree { line, .. } => *line,
            TraceEvent::Unknown => 0,
        }
    }
}

/// Split a stdout line at the sentinel marker.
///
/// Returns `Some((plain_prefix, event_payload))` when the marker is present;
/// `None` means the whole line is ordinary program output.
pub fn split_sentinel(line: &str) -> Option<(&str, &str)> {
    line.find(SENTINEL)
        .map(|idx| (&line[..idx], &line[idx + SENTINEL.len()..]))
}

/// Normalize an address string before any comparison: addresses come from
/// the target program's own formatting, so case and stray whitespace vary.
pub fn normalize_addr(addr: &str) -> String {
    addr.trim().to_ascii_lowercase()
}
