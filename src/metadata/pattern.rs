// Name Patterns
// Translates psql-style object patterns into SQL LIKE filters

/// A `[schema.]name` pattern split into LIKE filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePattern {
    pub schema: Option<String>,
    pub name: Option<String>,
}

impl NamePattern {
    pub fn is_empty(&self) -> bool {
        self.schema.is_none() && self.name.is_none()
    }
}

/// Parse a psql-style pattern.
///
/// Outside double quotes `*` matches any run of characters and `?` any single
/// character; a `.` separates schema from name. Double-quoted text is literal
/// and `""` inside quotes is one quote character.
pub fn parse_pattern(pattern: &str) -> NamePattern {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return NamePattern::default();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = pattern.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => quoted = !quoted,
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            '*' if !quoted => current.push('%'),
            '?' if !quoted => current.push('_'),
            c => current.push(c),
        }
    }
    parts.push(current);

    let non_empty = |s: String| if s.is_empty() || s == "%" { None } else { Some(s) };
    match parts.len() {
        1 => NamePattern {
            schema: None,
            name: non_empty(parts.remove(0)),
        },
        _ => {
            // a.b.c: keep the last two components
            let name = parts.pop().unwrap_or_default();
            let schema = parts.pop().unwrap_or_default();
            NamePattern {
                schema: non_empty(schema),
                name: non_empty(name),
            }
        }
    }
}

/// Whether a LIKE filter needs pattern matching rather than equality
pub fn has_wildcards(like: &str) -> bool {
    like.contains('%') || like.contains('_')
}

/// Client-side `LIKE` match, ASCII case-insensitive
pub fn like_match(like: &str, value: &str) -> bool {
    fn go(p: &[char], v: &[char]) -> bool {
        match p.split_first() {
            None => v.is_empty(),
            Some(('%', rest)) => (0..=v.len()).any(|i| go(rest, &v[i..])),
            Some(('_', rest)) => !v.is_empty() && go(rest, &v[1..]),
            Some((c, rest)) => v
                .split_first()
                .is_some_and(|(x, vrest)| x.eq_ignore_ascii_case(c) && go(rest, vrest)),
        }
    }
    let p: Vec<char> = like.chars().collect();
    let v: Vec<char> = value.chars().collect();
    go(&p, &v)
}
