// Command Catalog
// Static meta-command descriptors, modifier expansion and the flattened lookup map

use super::cmds::Cmd;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Modifier letters in canonical order: `S` shows system objects, `+` is verbose
pub const MODIFIERS: &[char] = &['S', '+'];

/// Help catalog sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Help,
    QueryBuffer,
    Informational,
    Transaction,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Help => "Help",
            Section::QueryBuffer => "Query Buffer",
            Section::Informational => "Informational",
            Section::Transaction => "Transaction",
        }
    }
}

/// One meta-command family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Desc {
    pub cmd: Cmd,
    /// `base` optionally followed by bracketed modifier letters, e.g. `d[S+]`
    pub pattern: &'static str,
    /// Usage placeholder for the arguments
    pub params: &'static str,
    pub desc: &'static str,
    /// Left out of the catalog unless hidden rows are requested; still dispatchable
    pub hidden: bool,
    /// Still dispatchable, flagged in the catalog
    pub deprecated: bool,
}

impl Desc {
    const fn new(cmd: Cmd, pattern: &'static str, params: &'static str, desc: &'static str) -> Self {
        Self {
            cmd,
            pattern,
            params,
            desc,
            hidden: false,
            deprecated: false,
        }
    }

    /// Split `d[S+]` into `("d", ['S', '+'])`
    pub fn base_and_modifiers(&self) -> (&'static str, Vec<char>) {
        match self.pattern.split_once('[') {
            Some((base, mods)) => (base, mods.trim_end_matches(']').chars().collect()),
            None => (self.pattern, Vec::new()),
        }
    }

    /// Every concrete name: one per subset of the modifiers, letters kept in declared order
    pub fn names(&self) -> Vec<String> {
        let (base, mods) = self.base_and_modifiers();
        (0..1usize << mods.len())
            .map(|mask| {
                let mut name = base.to_string();
                name.extend(
                    mods.iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, c)| *c),
                );
                name
            })
            .collect()
    }
}

/// Catalog sections with their descriptors, in display order
pub static SECTIONS: &[(Section, &[Desc])] = &[
    (
        Section::Help,
        &[Desc::new(Cmd::Help, "?", "[commands]", "show help on backslash commands")],
    ),
    (
        Section::QueryBuffer,
        &[Desc::new(Cmd::Reset, "r", "", "reset (clear) the query buffer")],
    ),
    (
        Section::Informational,
        &[
            Desc::new(
                Cmd::Describe,
                "d[S+]",
                "[NAME]",
                "list tables, views, and sequences or describe table, view, sequence, or index",
            ),
            Desc::new(Cmd::Describe, "da[S+]", "[PATTERN]", "list aggregates"),
            Desc::new(Cmd::Describe, "df[S+]", "[PATTERN]", "list functions"),
            Desc::new(Cmd::Describe, "di[S+]", "[PATTERN]", "list indexes"),
            Desc::new(Cmd::Describe, "dm[S+]", "[PATTERN]", "list materialized views"),
            Desc::new(Cmd::Describe, "dn[S+]", "[PATTERN]", "list schemas"),
            Desc::new(
                Cmd::Describe,
                "dp[S]",
                "[PATTERN]",
                "list table, view, and sequence access privileges",
            ),
            Desc::new(Cmd::Describe, "ds[S+]", "[PATTERN]", "list sequences"),
            Desc::new(Cmd::Describe, "dt[S+]", "[PATTERN]", "list tables"),
            Desc::new(Cmd::Describe, "dv[S+]", "[PATTERN]", "list views"),
            Desc::new(Cmd::Describe, "l[+]", "", "list databases"),
            Desc::new(Cmd::Stats, "ss[+]", "[TABLE|QUERY] [k]", "show stats for a table or a query"),
        ],
    ),
    (
        Section::Transaction,
        &[
            Desc::new(
                Cmd::Transact,
                "begin",
                "[-read-only] [ISOLATION]",
                "begin transaction, with optional isolation level",
            ),
            Desc::new(Cmd::Transact, "commit", "", "commit current transaction"),
            Desc::new(Cmd::Transact, "rollback", "", "rollback (abort) current transaction"),
        ],
    ),
];

/// `alias : target` pairs; aliases have no catalog row of their own
pub static ALIASES: &[(&str, &str)] = &[("abort", "rollback"), ("reset", "r")];

/// Reorder the trailing modifier letters of a typed name into canonical order
pub fn normalize(name: &str) -> String {
    let base = name.trim_end_matches(MODIFIERS);
    let mut mods: Vec<char> = name[base.len()..].chars().collect();
    mods.sort_by_key(|c| MODIFIERS.iter().position(|m| m == c));
    let mut out = base.to_string();
    out.extend(mods);
    out
}

static COMMANDS: Lazy<HashMap<String, Cmd>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (_, descs) in SECTIONS {
        for desc in descs.iter() {
            for name in desc.names() {
                map.insert(normalize(&name), desc.cmd);
            }
        }
    }
    for (alias, target) in ALIASES {
        if let Some(cmd) = map.get(*target).copied() {
            map.insert(alias.to_string(), cmd);
        }
    }
    map
});

/// Resolve a typed command token to its canonical name and handler
pub fn lookup(token: &str) -> Option<(String, Cmd)> {
    let normalized = normalize(token);
    let cmd = COMMANDS.get(&normalized).copied()?;
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, target)| target.to_string())
        .unwrap_or(normalized);
    Some((canonical, cmd))
}

/// Render a catalog: one row per visible descriptor, grouped by section
pub fn render_sections(sections: &[(Section, &[Desc])], show_hidden: bool) -> String {
    let visible = |d: &&Desc| show_hidden || !d.hidden;
    let usage = |d: &Desc| format!("\\{} {}", d.pattern, d.params).trim_end().to_string();
    let width = sections
        .iter()
        .flat_map(|(_, descs)| descs.iter().filter(visible))
        .map(|d| usage(d).len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (section, descs) in sections {
        let rows: Vec<&Desc> = descs.iter().filter(visible).collect();
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", section.title());
        for d in rows {
            let note = if d.deprecated { " (deprecated)" } else { "" };
            let _ = writeln!(out, "  {:<width$}  {}{}", usage(d), d.desc, note, width = width);
        }
        out.push('\n');
    }
    out
}

/// The built-in help catalog
pub fn render_catalog(show_hidden: bool) -> String {
    render_sections(SECTIONS, show_hidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_descs() -> impl Iterator<Item = &'static Desc> {
        SECTIONS.iter().flat_map(|(_, descs)| descs.iter())
    }

    #[test]
    fn test_expansion_is_power_set() {
        let desc = Desc::new(Cmd::Describe, "d[S+]", "", "");
        let names: HashSet<String> = desc.names().into_iter().collect();
        let expected: HashSet<String> = ["d", "dS", "d+", "dS+"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);

        for desc in all_descs() {
            let (_, mods) = desc.base_and_modifiers();
            let names = desc.names();
            assert_eq!(names.len(), 1 << mods.len(), "{}", desc.pattern);
            for name in names {
                let (_, cmd) = lookup(&name).unwrap();
                assert_eq!(cmd, desc.cmd, "{}", name);
            }
        }
    }

    #[test]
    fn test_lookup_normalizes_modifiers() {
        assert_eq!(normalize("d+S"), "dS+");
        assert_eq!(normalize("dt"), "dt");
        assert_eq!(lookup("d+S"), Some(("dS+".to_string(), Cmd::Describe)));
        assert_eq!(lookup("ss+"), Some(("ss+".to_string(), Cmd::Stats)));
        assert_eq!(lookup("dp+"), None);
        assert_eq!(lookup("dSS"), None);
        assert_eq!(lookup("x"), None);
    }

    #[test]
    fn test_aliases_resolve_to_target_name() {
        assert_eq!(lookup("abort"), Some(("rollback".to_string(), Cmd::Transact)));
        assert_eq!(lookup("reset"), Some(("r".to_string(), Cmd::Reset)));
    }

    #[test]
    fn test_catalog_has_one_row_per_pattern() {
        let catalog = render_catalog(false);
        for desc in all_descs() {
            let prefix = format!("\\{} ", desc.pattern);
            let prefix_eol = format!("\\{}", desc.pattern);
            let rows = catalog
                .lines()
                .map(str::trim_start)
                .filter(|l| l.starts_with(&prefix) || *l == prefix_eol)
                .count();
            assert_eq!(rows, 1, "{}", desc.pattern);
        }
        for (alias, _) in ALIASES {
            assert!(!catalog.contains(&format!("\\{} ", alias)));
        }
        let rows = catalog.lines().filter(|l| l.starts_with("  \\")).count();
        assert_eq!(rows, all_descs().count());
    }

    #[test]
    fn test_catalog_sections_in_order() {
        let catalog = render_catalog(false);
        let pos: Vec<usize> = ["Help", "Query Buffer", "Informational", "Transaction"]
            .iter()
            .map(|t| catalog.find(&format!("{}\n", t)).unwrap())
            .collect();
        assert!(pos.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_hidden_and_deprecated_rows() {
        let descs = [
            Desc::new(Cmd::Help, "x", "", "shown"),
            Desc {
                hidden: true,
                ..Desc::new(Cmd::Help, "y", "", "secret")
            },
            Desc {
                deprecated: true,
                ..Desc::new(Cmd::Help, "z", "", "old")
            },
        ];
        let sections: &[(Section, &[Desc])] = &[(Section::Help, &descs)];
        let short = render_sections(sections, false);
        assert!(short.contains("shown"));
        assert!(!short.contains("secret"));
        assert!(short.contains("old (deprecated)"));
        assert!(render_sections(sections, true).contains("secret"));
    }
}
