use serde::Serialize;

/// A reconstructed point-in-time view of the program: the answer to
/// "what did memory look like after event `step`?". Produced by the pure
/// fold in [`crate::replay::engine`]; consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayView {
    /// The (clamped) step this view reconstructs.
    pub step: usize,
    pub total: usize,
    /// Active frames, most recent activation first.
    pub frames: Vec<Frame>,
    pub heap: Vec<HeapBlock>,
    /// Names still allocated at the *end* of the log; populated only when
    /// the run is known to be complete.
    pub leaks: Vec<String>,
    pub description: String,
}

/// The local-variable namespace of one active function activation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    /// Insertion-ordered so variables display in declaration order.
    pub variables: Vec<Variable>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub(crate) fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    /// Normalized address string; empty when never observed.
    pub addr: String,
    #[serde(flatten)]
    pub kind: VariableKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableKind {
    Scalar {
        value: String,
        binding: BindingKind,
    },
    Pointer {
        /// Normalized target address.
        target: String,
        class: PointerClass,
        /// Display color index, assigned on first appearance, stable after.
        color: usize,
        /// Whether the last update was a write through the pointer.
        deref: bool,
    },
    Array {
        values: Vec<String>,
    },
    Array2d {
        rows: usize,
        cols: usize,
        values: Vec<String>,
    },
    Struct {
        struct_type: String,
        fields: Vec<(String, String)>,
    },
}

/// How a scalar binding was introduced. Constants are immutable for
/// display purposes only; the instrumenter never re-emits assigns for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Var,
    Const,
    Reference,
}

/// What a pointer's resolved target address means.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum PointerClass {
    /// Resolves to a known symbol, e.g. `a`, `nums[2]`, `p (heap)`.
    PointsTo { symbol: String },
    Null,
    /// Resolves to a freed heap block.
    Dangling,
    Invalid,
}

impl PointerClass {
    pub fn label(&self) -> String {
        match self {
            PointerClass::PointsTo { symbol } => format!("points to {symbol}"),
            PointerClass::Null => "null".to_string(),
            PointerClass::Dangling => "dangling".to_string(),
            PointerClass::Invalid => "invalid".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapBlock {
    pub name: String,
    pub values: Vec<String>,
    pub size: usize,
    pub kind: HeapKind,
    pub addr: String,
    /// Freed blocks are retained, never removed, so their last contents
    /// stay visible and stale pointers can classify as dangling.
    pub freed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeapKind {
    Single,
    Array,
}

impl std::fmt::Display for ReplayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.total == 0 {
            return writeln!(f, "(empty trace)");
        }
        writeln!(f, "step {}/{}: {}", self.step + 1, self.total, self.description)?;
        for frame in &self.frames {
            writeln!(f, "frame {}", frame.name)?;
            for var in &frame.variables {
                match &var.kind {
                    VariableKind::Scalar { value, binding } => {
                        let marker = match binding {
                            BindingKind::Const => " (const)",
                            BindingKind::Reference => " (ref)",
                            BindingKind::Var => "",
                        };
                        writeln!(f, "  {} = {}{}", var.name, value, marker)?;
                    }
                    VariableKind::Pointer { class, color, .. } => {
                        writeln!(f, "  {} -> {} [color {}]", var.name, class.label(), color)?;
                    }
                    VariableKind::Array { values } => {
                        writeln!(f, "  {} = [{}]", var.name, values.join(", "))?;
                    }
                    VariableKind::Array2d { rows, cols, values } => {
                        writeln!(
                            f,
                            "  {} = {}x{} [{}]",
                            var.name,
                            rows,
                            cols,
                            values.join(", ")
                        )?;
                    }
                    VariableKind::Struct {
                        struct_type,
                        fields,
                    } => {
                        let body: Vec<String> =
                            fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                        writeln!(
                            f,
                            "  {} = {} {{ {} }}",
                            var.name,
                            struct_type,
                            body.join(", ")
                        )?;
                    }
                }
            }
        }
        if !self.heap.is_empty() {
            writeln!(f, "heap")?;
            for block in &self.heap {
                let freed = if block.freed { " (freed)" } else { "" };
                writeln!(
                    f,
                    "  {} @ {} = [{}]{}",
                    block.name,
                    block.addr,
                    block.values.join(", "),
                    freed
                )?;
            }
        }
        if !self.leaks.is_empty() {
            writeln!(f, "leaked: {}", self.leaks.join(", "))?;
        }
        Ok(())
    }
}
