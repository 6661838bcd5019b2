use regex::Regex;

/// Pre-compiled recognizers for the bounded C construct set.
///
/// One statement per line; anything these patterns don't match passes
/// through untouched and produces no trace event.
#[derive(Debug)]
pub struct Patterns {
    /// `int name(params) {`, requires the opening brace on the same line
    pub func_def: Regex,
    /// `return expr;`
    pub return_stmt: Regex,
    /// `}`, `};` or `} while (cond);`
    pub close_brace: Regex,
    /// `if/else/for/while/do/switch ... {`, optionally preceded by `}`
    pub scope_open: Regex,
    /// induction variable of a `for (int i = 0; ...)` header
    pub for_init: Regex,
    /// `[const] [unsigned] type declarators ;`
    pub decl: Regex,
    /// `struct S name [= {...}];`
    pub struct_decl: Regex,
    /// `.field = value` pairs inside a designated initializer
    pub designated_init: Regex,
    /// `name.field = expr;`
    pub field_assign: Regex,
    /// `*name = expr;`
    pub deref_assign: Regex,
    /// `name[i] = expr;` or `name[i][j] = expr;`
    pub index_assign: Regex,
    /// `name = expr;` (plain or compound assignment)
    pub plain_assign: Regex,
    /// `name++;` / `name--;`
    pub incr_stmt: Regex,
    /// `free(name);`
    pub free_stmt: Regex,
    /// `malloc(...)` / `calloc(...)` anywhere in an initializer
    pub alloc_call: Regex,
    /// element count inside a malloc argument: `N * sizeof(...)` either order
    pub alloc_count: Regex,
    /// first argument of calloc
    pub calloc_count: Regex,

    // declarator shapes, applied after splitting on top-level commas
    pub dtor_pointer: Regex,
    pub dtor_reference: Regex,
    pub dtor_array2d: Regex,
    pub dtor_array: Regex,
    pub dtor_scalar: Regex,
    /// one parameter in a function definition
    pub param: Regex,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            func_def: re(
                r"^(?:(?:static|inline)\s+)*(void|int|char|float|double|long)\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*\{$",
            ),
            return_stmt: re(r"^return\b[^;]*;$"),
            close_brace: re(r"^\}\s*(?:while\s*\([^)]*\)\s*;|;)?$"),
            scope_open: re(r"^(\}\s*)?(else\s+if|else|if|for|while|do|switch)\b.*\{$"),
            for_init: re(r"^for\s*\(\s*(?:int|long)?\s*([A-Za-z_]\w*)\s*="),
            decl: re(
                r"^(const\s+)?(?:(?:unsigned|signed)\s+)?(int|char|float|double|long)\s+([^;]+);$",
            ),
            struct_decl: re(
                r"^struct\s+([A-Za-z_]\w*)\s+([A-Za-z_]\w*)\s*(?:=\s*\{(.*)\}\s*)?;$",
            ),
            designated_init: re(r"\.([A-Za-z_]\w*)\s*=\s*([^,}]+)"),
            field_assign: re(r"^([A-Za-z_]\w*)\.([A-Za-z_]\w*)\s*=\s*([^;]+);$"),
            deref_assign: re(r"^\*\s*([A-Za-z_]\w*)\s*=\s*([^;]+);$"),
            index_assign: re(
                r"^([A-Za-z_]\w*)\s*\[([^\]]+)\]\s*(?:\[([^\]]+)\])?\s*=\s*([^;]+);$",
            ),
            plain_assign: re(r"^([A-Za-z_]\w*)\s*(\+=|-=|\*=|/=|%=|=)\s*([^=;][^;]*);$"),
            incr_stmt: re(r"^([A-Za-z_]\w*)\s*(\+\+|--)\s*;$"),
            free_stmt: re(r"^free\s*\(\s*([A-Za-z_]\w*)\s*\)\s*;$"),
            alloc_call: re(r"\b(malloc|calloc)\s*\("),
            alloc_count: re(
                r"(?:([A-Za-z_]\w*|\d+)\s*\*\s*sizeof|sizeof\s*\([^)]*\)\s*\*\s*([A-Za-z_]\w*|\d+))",
            ),
            calloc_count: re(r"calloc\s*\(\s*([^,]+?)\s*,"),
            dtor_pointer: re(r"^\*+\s*([A-Za-z_]\w*)\s*(?:=\s*(.+))?$"),
            dtor_reference: re(r"^&\s*([A-Za-z_]\w*)\s*=\s*(.+)$"),
            dtor_array2d: re(
                r"^([A-Za-z_]\w*)\s*\[\s*([^\]]+?)\s*\]\s*\[\s*([^\]]+?)\s*\]\s*(?:=\s*(.+))?$",
            ),
            dtor_array: re(r"^([A-Za-z_]\w*)\s*\[\s*([^\]]+?)\s*\]\s*(?:=\s*(.+))?$"),
            dtor_scalar: re(r"^([A-Za-z_]\w*)\s*(?:=\s*(.+))?$"),
            param: re(
                r"^(?:const\s+)?(?:(?:unsigned|signed)\s+)?(int|char|float|double|long)\s*(\*)?\s*(&)?\s*([A-Za-z_]\w*)$",
            ),
        }
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a declarator list on commas that are not nested inside
/// parentheses, brackets, or braces (`int a = 1, b[2] = {0, 1}` splits
/// into two declarators, not three).
pub fn split_declarators(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in list.chars() {
        match ch {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}
