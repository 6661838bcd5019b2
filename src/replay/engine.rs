use std::collections::{BTreeSet, HashMap};

use crate::replay::describe::describe;
use crate::replay::view::{
    BindingKind, Frame, HeapBlock, HeapKind, PointerClass, ReplayView, Variable, VariableKind,
};
use crate::trace::{normalize_addr, TraceAction, TraceEvent};

/// Reconstruct program state after event `step` by folding the log prefix.
///
/// Pure and re-entrant: every lookup table is a local accumulator rebuilt on
/// each call, so replaying the same prefix twice is bit-identical and a step
/// slider can jump anywhere without invalidation. `run_complete` gates leak
/// reporting; a paused or errored run cannot distinguish a leak from an
/// allocation that has not been freed *yet*.
pub fn replay(events: &[TraceEvent], step: usize, run_complete: bool) -> ReplayView {
    let total = events.len();
    if total == 0 {
        return ReplayView {
            step: 0,
            total: 0,
            frames: vec![Frame::new(ROOT_FRAME)],
            heap: Vec::new(),
            leaks: Vec::new(),
            description: String::new(),
        };
    }

    let step = step.min(total - 1);
    let mut fold = Fold::new();
    let mut description = String::new();
    for (i, event) in events[..=step].iter().enumerate() {
        if i == step {
            // The description needs the value *before* this event lands.
            let previous = fold.current_value(event);
            description = describe(event, previous.as_deref());
        }
        fold.apply(event);
    }

    let leaks = if run_complete {
        let mut full = Fold::new();
        for event in events {
            full.apply(event);
        }
        full.outstanding.into_iter().collect()
    } else {
        Vec::new()
    };

    let mut frames = fold.frames;
    frames.reverse();
    ReplayView {
        step,
        total,
        frames,
        heap: fold.heap,
        leaks,
        description,
    }
}

const ROOT_FRAME: &str = "program";

/// Assumed element width for per-element address identities. The recognized
/// construct set is int-based, so 4 bytes covers it.
const ELEM_STRIDE: u64 = 4;

/// Accumulator for one fold over a log prefix.
struct Fold {
    /// Index 0 is the root frame; the last element is the innermost.
    frames: Vec<Frame>,
    heap: Vec<HeapBlock>,
    /// Normalized address -> symbol id (`var-a`, `var-a-2`, `heap-p`,
    /// `var-pt.x`). Last writer wins when an address is reused.
    identity: HashMap<String, String>,
    /// Pointer name -> display color, assigned once, stable thereafter.
    colors: HashMap<String, usize>,
    next_color: usize,
    /// Heap names allocated but not yet freed, in stable order.
    outstanding: BTreeSet<String>,
}

impl Fold {
    fn new() -> Self {
        Self {
            frames: vec![Frame::new(ROOT_FRAME)],
            heap: Vec::new(),
            identity: HashMap::new(),
            colors: HashMap::new(),
            next_color: 0,
            outstanding: BTreeSet::new(),
        }
    }

    fn apply(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::Func { name, action, .. } => match action {
                TraceAction::Enter => self.frames.push(Frame::new(name.clone())),
                TraceAction::Exit => {
                    // The root frame outlives every exit event.
                    if self.frames.len() > 1 {
                        self.frames.pop();
                    }
                }
            },
            TraceEvent::Scope { .. } | TraceEvent::Unknown => {}

            TraceEvent::Var { name, value, addr, .. } => {
                self.bind_scalar(name, value, addr, BindingKind::Var);
            }
            TraceEvent::Const { name, value, addr, .. } => {
                self.bind_scalar(name, value, addr, BindingKind::Const);
            }
            TraceEvent::Reference { name, value, addr, .. } => {
                self.bind_scalar(name, value, addr, BindingKind::Reference);
            }

            TraceEvent::Assign { name, value, .. } => self.apply_assign(name, value),

            TraceEvent::Pointer {
                name,
                addr,
                value,
                deref,
                ..
            } => {
                let target = normalize_addr(value);
                let class = self.classify(&target);
                let color = match self.colors.get(name) {
                    Some(c) => *c,
                    None => {
                        let c = self.next_color;
                        self.next_color += 1;
                        self.colors.insert(name.clone(), c);
                        c
                    }
                };
                let addr = normalize_addr(addr);
                if !addr.is_empty() {
                    self.identity.insert(addr.clone(), format!("var-{name}"));
                }
                self.upsert_variable(
                    name,
                    &addr,
                    VariableKind::Pointer {
                        target,
                        class,
                        color,
                        deref: *deref,
                    },
                );
            }

            TraceEvent::Array {
                name,
                value,
                size,
                addr,
                ..
            } => {
                let values = element_values(value, *size as usize);
                let addr = normalize_addr(addr);
                self.identity.insert(addr.clone(), format!("var-{name}"));
                if let Some(base) = parse_addr(&addr) {
                    for i in 0..*size as u64 {
                        // A base near the top of the address space would wrap;
                        // stop registering rather than fault on a hostile log.
                        let Some(elem) = base.checked_add(i * ELEM_STRIDE) else {
                            break;
                        };
                        self.identity
                            .insert(format!("0x{elem:x}"), format!("var-{name}-{i}"));
                    }
                }
                self.upsert_variable(name, &addr, VariableKind::Array { values });
            }

            TraceEvent::Array2d {
                name,
                value,
                rows,
                cols,
                addr,
                ..
            } => {
                let values = element_values(value, (*rows as usize) * (*cols as usize));
                let addr = normalize_addr(addr);
                self.identity.insert(addr.clone(), format!("var-{name}"));
                self.upsert_variable(
                    name,
                    &addr,
                    VariableKind::Array2d {
                        rows: *rows as usize,
                        cols: *cols as usize,
                        values,
                    },
                );
            }

            TraceEvent::Struct {
                name,
                struct_type,
                addr,
                ..
            } => {
                let addr = normalize_addr(addr);
                self.identity.insert(addr.clone(), format!("var-{name}"));
                self.upsert_variable(
                    name,
                    &addr,
                    VariableKind::Struct {
                        struct_type: struct_type.clone(),
                        fields: Vec::new(),
                    },
                );
            }

            TraceEvent::Field {
                owner,
                field,
                value,
                addr,
                ..
            } => {
                let Some(var) = self.find_variable_mut(owner) else {
                    return; // field for a struct we never saw declared
                };
                let VariableKind::Struct { fields, .. } = &mut var.kind else {
                    return;
                };
                match fields.iter_mut().find(|(f, _)| f == field) {
                    Some(slot) => slot.1 = value.clone(),
                    None => fields.push((field.clone(), value.clone())),
                }
                let addr = normalize_addr(addr);
                if !addr.is_empty() {
                    self.identity.insert(addr, format!("var-{owner}.{field}"));
                }
            }

            TraceEvent::HeapAlloc {
                name, size, addr, ..
            } => self.apply_alloc(name, *size as usize, addr, HeapKind::Single),
            TraceEvent::HeapArray {
                name, size, addr, ..
            } => self.apply_alloc(name, *size as usize, addr, HeapKind::Array),

            TraceEvent::HeapFree { name, addr, .. } => {
                let addr = normalize_addr(addr);
                if let Some(block) = self
                    .heap
                    .iter_mut()
                    .rev()
                    .find(|b| b.addr == addr || (b.name == *name && !b.freed))
                {
                    block.freed = true;
                    let freed_addr = block.addr.clone();
                    self.outstanding.remove(name);
                    self.mark_dangling(&freed_addr);
                }
            }
        }
    }

    fn bind_scalar(&mut self, name: &str, value: &str, addr: &str, binding: BindingKind) {
        let addr = normalize_addr(addr);
        if !addr.is_empty() {
            self.identity.insert(addr.clone(), format!("var-{name}"));
        }
        self.upsert_variable(
            name,
            &addr,
            VariableKind::Scalar {
                value: value.to_string(),
                binding,
            },
        );
    }

    fn apply_alloc(&mut self, name: &str, size: usize, addr: &str, kind: HeapKind) {
        let addr = normalize_addr(addr);
        self.identity.insert(addr.clone(), format!("heap-{name}"));
        self.heap.push(HeapBlock {
            name: name.to_string(),
            values: vec!["?".to_string(); size.max(1)],
            size: size.max(1),
            kind,
            addr,
            freed: false,
        });
        self.outstanding.insert(name.to_string());
    }

    /// Route an `assign` event to the binding it names: a plain scalar, an
    /// array/heap element (`a[2]`, `m[0][1]`), or a pointer target (`*p`).
    fn apply_assign(&mut self, name: &str, value: &str) {
        if let Some(pointer) = name.strip_prefix('*') {
            let Some(target) = self.pointer_target(pointer) else {
                return;
            };
            self.write_address(&target, value);
            return;
        }

        if let Some((base, row, col)) = parse_indexed(name) {
            self.write_element(&base, row, col, value);
            return;
        }

        match self.find_variable_mut(name) {
            Some(var) => {
                if let VariableKind::Scalar { value: slot, .. } = &mut var.kind {
                    *slot = value.to_string();
                }
            }
            // Loop induction variables first appear as assigns, not decls.
            None => self.bind_scalar(name, value, "", BindingKind::Var),
        }
    }

    fn write_element(&mut self, base: &str, row: usize, col: Option<usize>, value: &str) {
        let pointer_target = match self.find_variable_mut(base) {
            Some(var) => match &mut var.kind {
                VariableKind::Array { values } => {
                    if col.is_none() {
                        if let Some(slot) = values.get_mut(row) {
                            *slot = value.to_string();
                        }
                    }
                    return;
                }
                VariableKind::Array2d { cols, values, .. } => {
                    if let Some(idx) = col.and_then(|c| flat_index(row, *cols, c)) {
                        if let Some(slot) = values.get_mut(idx) {
                            *slot = value.to_string();
                        }
                    }
                    return;
                }
                VariableKind::Pointer { target, .. } => Some(target.clone()),
                _ => return,
            },
            None => None,
        };
        // `p[i]` through a heap pointer lands in the pointed-at block.
        if let (Some(target), None) = (pointer_target, col) {
            if let Some(block) = self.heap.iter_mut().rev().find(|b| b.addr == target) {
                if let Some(slot) = block.values.get_mut(row) {
                    *slot = value.to_string();
                }
            }
        }
    }

    /// Write `value` to whatever lives at a resolved target address:
    /// a heap block element (offset from the block base) or an identified
    /// variable. Unresolvable targets are ignored.
    fn write_address(&mut self, target: &str, value: &str) {
        let target_num = parse_addr(target);
        for block in self.heap.iter_mut().rev() {
            let Some(base) = parse_addr(&block.addr) else {
                continue;
            };
            let offset = match target_num {
                Some(t) if t >= base => (t - base) / ELEM_STRIDE,
                _ if block.addr == target => 0,
                _ => continue,
            };
            if let Some(slot) = block.values.get_mut(offset as usize) {
                *slot = value.to_string();
                return;
            }
        }
        let Some(id) = self.identity.get(target).cloned() else {
            return;
        };
        self.write_symbol(&id, value);
    }

    fn write_symbol(&mut self, id: &str, value: &str) {
        let Some(rest) = id.strip_prefix("var-") else {
            return;
        };
        if let Some((owner, field)) = rest.split_once('.') {
            let owner = owner.to_string();
            let field = field.to_string();
            if let Some(var) = self.find_variable_mut(&owner) {
                if let VariableKind::Struct { fields, .. } = &mut var.kind {
                    if let Some(slot) = fields.iter_mut().find(|(f, _)| *f == field) {
                        slot.1 = value.to_string();
                    }
                }
            }
            return;
        }
        if let Some((base, idx)) = split_element_id(rest) {
            let base = base.to_string();
            if let Some(var) = self.find_variable_mut(&base) {
                if let VariableKind::Array { values } = &mut var.kind {
                    if let Some(slot) = values.get_mut(idx) {
                        *slot = value.to_string();
                    }
                }
            }
            return;
        }
        let name = rest.to_string();
        if let Some(var) = self.find_variable_mut(&name) {
            if let VariableKind::Scalar { value: slot, .. } = &mut var.kind {
                *slot = value.to_string();
            }
        }
    }

    fn classify(&self, target: &str) -> PointerClass {
        if is_null_addr(target) {
            return PointerClass::Null;
        }
        if let Some(block) = self.heap.iter().rev().find(|b| b.addr == target) {
            return if block.freed {
                PointerClass::Dangling
            } else {
                PointerClass::PointsTo {
                    symbol: format!("{} (heap)", block.name),
                }
            };
        }
        match self.identity.get(target) {
            Some(id) => PointerClass::PointsTo {
                symbol: display_symbol(id),
            },
            None => PointerClass::Invalid,
        }
    }

    /// Flip live pointers at a just-freed address to dangling.
    fn mark_dangling(&mut self, freed_addr: &str) {
        for frame in &mut self.frames {
            for var in &mut frame.variables {
                if let VariableKind::Pointer { target, class, .. } = &mut var.kind {
                    if target == freed_addr {
                        *class = PointerClass::Dangling;
                    }
                }
            }
        }
    }

    /// Bindings land in the innermost frame; rebinding an existing name
    /// replaces it in place so declaration order is preserved.
    fn upsert_variable(&mut self, name: &str, addr: &str, kind: VariableKind) {
        // The root frame is never popped, so a frame is always present.
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match frame.variable_mut(name) {
            Some(var) => {
                if !addr.is_empty() {
                    var.addr = addr.to_string();
                }
                var.kind = kind;
            }
            None => frame.variables.push(Variable {
                name: name.to_string(),
                addr: addr.to_string(),
                kind,
            }),
        }
    }

    /// Innermost-out name lookup across live frames.
    fn find_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|f| f.variable_mut(name))
    }

    fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|f| f.variable(name))
    }

    fn pointer_target(&self, name: &str) -> Option<String> {
        match &self.find_variable(name)?.kind {
            VariableKind::Pointer { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    /// The value an event is about to overwrite, for "old -> new" phrasing.
    fn current_value(&self, event: &TraceEvent) -> Option<String> {
        match event {
            TraceEvent::Assign { name, .. } => {
                if let Some(pointer) = name.strip_prefix('*') {
                    let target = self.pointer_target(pointer)?;
                    return self
                        .heap
                        .iter()
                        .rev()
                        .find(|b| b.addr == target)
                        .and_then(|b| b.values.first().cloned());
                }
                if let Some((base, row, col)) = parse_indexed(name) {
                    return match &self.find_variable(&base)?.kind {
                        VariableKind::Array { values } => values.get(row).cloned(),
                        VariableKind::Array2d { cols, values, .. } => {
                            flat_index(row, *cols, col?).and_then(|idx| values.get(idx).cloned())
                        }
                        _ => None,
                    };
                }
                match &self.find_variable(name)?.kind {
                    VariableKind::Scalar { value, .. } => Some(value.clone()),
                    _ => None,
                }
            }
            TraceEvent::Pointer { name, .. } => match &self.find_variable(name)?.kind {
                VariableKind::Pointer { class, .. } => Some(class.label()),
                _ => None,
            },
            TraceEvent::Field { owner, field, .. } => match &self.find_variable(owner)?.kind {
                VariableKind::Struct { fields, .. } => fields
                    .iter()
                    .find(|(f, _)| f == field)
                    .map(|(_, v)| v.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// `var-a` -> `a`, `var-a-2` -> `a[2]`, `heap-p` -> `p (heap)`,
/// `var-pt.x` -> `pt.x`.
fn display_symbol(id: &str) -> String {
    if let Some(name) = id.strip_prefix("heap-") {
        return format!("{name} (heap)");
    }
    let rest = id.strip_prefix("var-").unwrap_or(id);
    match split_element_id(rest) {
        Some((base, idx)) => format!("{base}[{idx}]"),
        None => rest.to_string(),
    }
}

/// Split a `<name>-<index>` element id. C identifiers never contain `-`,
/// so a trailing all-digit segment is unambiguous.
fn split_element_id(rest: &str) -> Option<(&str, usize)> {
    let (base, idx) = rest.rsplit_once('-')?;
    let idx = idx.parse().ok()?;
    Some((base, idx))
}

/// Row-major flat index, `None` when log-supplied indices would overflow.
fn flat_index(row: usize, cols: usize, col: usize) -> Option<usize> {
    row.checked_mul(cols)?.checked_add(col)
}

/// Parse `base[i]` / `base[i][j]` assign targets.
fn parse_indexed(name: &str) -> Option<(String, usize, Option<usize>)> {
    let open = name.find('[')?;
    let base = &name[..open];
    if base.is_empty() || !name.ends_with(']') {
        return None;
    }
    let mut indices = name[open..]
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split("][")
        .map(|s| s.parse::<usize>());
    let row = indices.next()?.ok()?;
    let col = match indices.next() {
        Some(Ok(c)) => Some(c),
        Some(Err(_)) => return None,
        None => None,
    };
    if indices.next().is_some() {
        return None;
    }
    Some((base.to_string(), row, col))
}

fn parse_addr(addr: &str) -> Option<u64> {
    u64::from_str_radix(addr.strip_prefix("0x")?, 16).ok()
}

fn is_null_addr(addr: &str) -> bool {
    matches!(addr, "" | "0" | "0x0" | "(nil)" | "(null)") || parse_addr(addr) == Some(0)
}

/// Comma-joined element text -> padded value vector of exactly `len`.
fn element_values(joined: &str, len: usize) -> Vec<String> {
    let mut values: Vec<String> = if joined.is_empty() {
        Vec::new()
    } else {
        joined.split(',').map(|v| v.trim().to_string()).collect()
    };
    values.resize(len.max(values.len()), "?".to_string());
    values.truncate(len.max(1));
    values
}
