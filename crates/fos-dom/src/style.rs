//! Inline Style
//!
//! Minimal `style` attribute handling: enough to read and write single
//! declarations such as `background-image` without a full CSS parser.

/// Parse `a: b; c: d` into ordered `(property, value)` pairs.
///
/// Property names are lowercased. Semicolons inside parentheses or quotes
/// (e.g. `url(data:…;base64,…)`) do not split declarations.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    let mut push = |chunk: &str| {
        if let Some((name, value)) = chunk.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() {
                declarations.push((name.to_ascii_lowercase(), value.to_string()));
            }
        }
    };

    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&style[start..]);

    declarations
}

/// Serialize declarations back into `a: b; c: d;` form
pub fn serialize_inline_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace or append one declaration. Returns `None` when nothing changed.
pub(crate) fn with_property(style: &str, property: &str, value: &str) -> Option<String> {
    let property = property.to_ascii_lowercase();
    let mut declarations = parse_inline_style(style);

    match declarations.iter_mut().find(|(name, _)| *name == property) {
        Some((_, current)) if current == value => return None,
        Some((_, current)) => *current = value.to_string(),
        None => declarations.push((property, value.to_string())),
    }

    Some(serialize_inline_style(&declarations))
}
