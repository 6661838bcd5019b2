//! Renders the C `printf` statements the instrumenter injects.
//!
//! Each statement prints one sentinel-prefixed JSON trace line. Values the
//! target program must observe at runtime become printf format specifiers;
//! everything known at instrumentation time is baked in as a literal.

use crate::trace::SENTINEL;

/// printf format specifier for a declared C scalar type.
pub fn format_spec(ctype: &str) -> &'static str {
    match ctype {
        "char" => "%c",
        "long" => "%ld",
        "float" | "double" => "%g",
        _ => "%d",
    }
}

/// Escape text that lands inside the C string literal of a trace printf:
/// JSON quotes, C escapes, and printf's own `%`.
fn c_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            // Double-escaped: once for the C string literal, once more so the
            // printed JSON text itself stays well-formed.
            '"' => out.push_str("\\\\\\\""),
            '\\' => out.push_str("\\\\\\\\"),
            '%' => out.push_str("%%"),
            '\n' | '\r' | '\t' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Builder for one injected trace statement.
pub struct TraceStmt {
    fields: Vec<String>,
    args: Vec<String>,
}

impl TraceStmt {
    pub fn new(kind: &str, line: u32) -> Self {
        Self {
            fields: vec![
                format!("\\\"kind\\\":\\\"{kind}\\\""),
                format!("\\\"line\\\":{line}"),
            ],
            args: Vec::new(),
        }
    }

    /// String field with a value fixed at instrumentation time.
    pub fn lit_str(mut self, key: &str, value: &str) -> Self {
        self.fields
            .push(format!("\\\"{key}\\\":\\\"{}\\\"", c_escape(value)));
        self
    }

    /// Bare (number/bool) field fixed at instrumentation time.
    pub fn lit_raw(mut self, key: &str, value: &str) -> Self {
        self.fields.push(format!("\\\"{key}\\\":{value}"));
        self
    }

    /// String field observed at runtime through a printf specifier.
    pub fn fmt_str(mut self, key: &str, spec: &str, arg: &str) -> Self {
        self.fields.push(format!("\\\"{key}\\\":\\\"{spec}\\\""));
        self.args.push(arg.to_string());
        self
    }

    /// String field whose *name text* itself carries specifiers, e.g. the
    /// indexed name `a[%d]` with the index expression as argument.
    pub fn fmt_name(mut self, key: &str, template: &str, args: &[&str]) -> Self {
        self.fields.push(format!("\\\"{key}\\\":\\\"{template}\\\""));
        for arg in args {
            self.args.push((*arg).to_string());
        }
        self
    }

    /// Bare numeric field observed at runtime.
    pub fn fmt_raw(mut self, key: &str, spec: &str, arg: &str) -> Self {
        self.fields.push(format!("\\\"{key}\\\":{spec}"));
        self.args.push(arg.to_string());
        self
    }

    pub fn build(self) -> String {
        let body = self.fields.join(",");
        let args: String = self.args.iter().map(|a| format!(", {a}")).collect();
        format!("printf(\"{SENTINEL}{{{body}}}\\n\"{args});")
    }
}

/// Address-of expression rendered the way every emitted `addr` field uses it.
pub fn addr_of(name: &str) -> String {
    format!("(void*)&{name}")
}

/// A 1-D array trace: header printf, a single-line loop printing the
/// comma-joined elements, then size and base address.
pub fn array_stmt(line: u32, name: &str, spec: &str, size_expr: &str) -> String {
    format!(
        "{{ printf(\"{SENTINEL}{{\\\"kind\\\":\\\"array\\\",\\\"line\\\":{line},\\\"name\\\":\\\"{name}\\\",\\\"value\\\":\\\"\"); \
for (int __ml_i = 0; __ml_i < ({size_expr}); __ml_i++) printf(__ml_i ? \",{spec}\" : \"{spec}\", {name}[__ml_i]); \
printf(\"\\\",\\\"size\\\":%d,\\\"addr\\\":\\\"%p\\\"}}\\n\", (int)({size_expr}), (void*){name}); }}"
    )
}

/// A 2-D array trace printing row-major flattened elements.
pub fn array2d_stmt(line: u32, name: &str, spec: &str, rows: &str, cols: &str) -> String {
    format!(
        "{{ printf(\"{SENTINEL}{{\\\"kind\\\":\\\"array2d\\\",\\\"line\\\":{line},\\\"name\\\":\\\"{name}\\\",\\\"value\\\":\\\"\"); \
for (int __ml_r = 0; __ml_r < ({rows}); __ml_r++) for (int __ml_c = 0; __ml_c < ({cols}); __ml_c++) \
printf((__ml_r || __ml_c) ? \",{spec}\" : \"{spec}\", {name}[__ml_r][__ml_c]); \
printf(\"\\\",\\\"rows\\\":%d,\\\"cols\\\":%d,\\\"addr\\\":\\\"%p\\\"}}\\n\", (int)({rows}), (int)({cols}), (void*){name}); }}"
    )
}

pub fn func_stmt(line: u32, name: &str, action: &str) -> String {
    TraceStmt::new("func", line)
        .lit_str("name", name)
        .lit_str("action", action)
        .build()
}

pub fn scope_stmt(line: u32, scope_type: &str, action: &str) -> String {
    TraceStmt::new("scope", line)
        .lit_str("scope_type", scope_type)
        .lit_str("action", action)
        .build()
}
