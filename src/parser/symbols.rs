use std::fmt;

use indexmap::IndexMap;

/// Prefix of every injected anchor name. Dash matches on it literally.
pub const DASH_ANCHOR_PREFIX: &str = "//apple_ref/cpp/";
pub const DASH_ANCHOR_CLASS: &str = "dashAnchor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Function,
    Type,
    Enum,
    Struct,
    Define,
}

impl Kind {
    pub const ALL: [Kind; 5] = [Kind::Function, Kind::Type, Kind::Enum, Kind::Struct, Kind::Define];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Function => "Function",
            Kind::Type => "Type",
            Kind::Enum => "Enum",
            Kind::Struct => "Struct",
            Kind::Define => "Define",
        }
    }

    pub fn from_name(s: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum NameRule {
    Suffix(&'static str),
    Contains(&'static str),
}

/// First guess from the identifier alone, checked top to bottom.
const NAME_RULES: &[(NameRule, Kind)] = &[
    (NameRule::Suffix("_t"), Kind::Type),
    (NameRule::Contains("_rngtype_"), Kind::Type),
];

/// Declaration prefixes, checked top to bottom against the trimmed text of
/// the `<pre>` block. Order matters: `typedef` alone must come last.
const DECLARATION_RULES: &[(&str, Kind)] = &[
    ("typedef enum", Kind::Enum),
    ("typedef struct", Kind::Struct),
    ("typedef", Kind::Type),
    ("#define", Kind::Define),
];

pub fn guess_kind(name: &str) -> Kind {
    NAME_RULES
        .iter()
        .find(|(rule, _)| match rule {
            NameRule::Suffix(s) => name.ends_with(s),
            NameRule::Contains(s) => name.contains(s),
        })
        .map_or(Kind::Function, |(_, kind)| *kind)
}

/// Kind implied by a declaration snippet, or `None` when the snippet says
/// nothing more specific (e.g. a function prototype).
pub fn classify_declaration(code: &str) -> Option<Kind> {
    let code = code.trim();
    DECLARATION_RULES
        .iter()
        .find(|(prefix, _)| code.starts_with(prefix))
        .map(|(_, kind)| *kind)
}

pub fn dash_anchor(kind: Kind, name: &str) -> String {
    format!("{}{}/{}", DASH_ANCHOR_PREFIX, kind, name)
}

/// Inverse of [`dash_anchor`].
pub fn parse_dash_anchor(anchor: &str) -> Option<(Kind, &str)> {
    let rest = anchor.strip_prefix(DASH_ANCHOR_PREFIX)?;
    let (kind, name) = rest.split_once('/')?;
    Some((Kind::from_name(kind)?, name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: Kind,
    /// Page path plus optional `#fragment`, relative to the Documents dir.
    pub location: String,
}

/// Symbols keyed by name, in the order they were first seen.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing entry of the same name in place.
    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Overwrite the kind of a known symbol. Unknown names are ignored.
    pub fn set_kind(&mut self, name: &str, kind: Kind) {
        if let Some(sym) = self.symbols.get_mut(name) {
            sym.kind = kind;
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_shape_guess() {
        assert_eq!(guess_kind("igraph_vector_t"), Kind::Type);
        assert_eq!(guess_kind("igraph_rngtype_mt19937"), Kind::Type);
        assert_eq!(guess_kind("igraph_add_edge"), Kind::Function);
        // "_t" must be a suffix, not just present
        assert_eq!(guess_kind("igraph_t_test"), Kind::Function);
    }

    #[test]
    fn declaration_prefixes() {
        assert_eq!(classify_declaration("  typedef enum { A, B } x;"), Some(Kind::Enum));
        assert_eq!(
            classify_declaration("typedef struct Foo { int n; } igraph_foo;"),
            Some(Kind::Struct)
        );
        assert_eq!(classify_declaration("typedef int igraph_integer_t;"), Some(Kind::Type));
        assert_eq!(classify_declaration("\n#define IGRAPH_VERSION 1"), Some(Kind::Define));
        assert_eq!(
            classify_declaration("igraph_error_t igraph_add_edge(igraph_t *graph);"),
            None
        );
    }

    #[test]
    fn anchor_format() {
        assert_eq!(
            dash_anchor(Kind::Struct, "igraph_foo"),
            "//apple_ref/cpp/Struct/igraph_foo"
        );
        assert_eq!(
            parse_dash_anchor("//apple_ref/cpp/Define/IGRAPH_FOO"),
            Some((Kind::Define, "IGRAPH_FOO"))
        );
        assert_eq!(parse_dash_anchor("//apple_ref/cpp/Class/x"), None);
        assert_eq!(parse_dash_anchor("igraph_foo"), None);
    }

    #[test]
    fn table_keeps_first_position_on_overwrite() {
        let mut t = SymbolTable::new();
        for (name, loc) in [("a", "1.html"), ("b", "2.html"), ("a", "3.html")] {
            t.insert(Symbol {
                name: name.into(),
                kind: Kind::Function,
                location: loc.into(),
            });
        }
        let names: Vec<_> = t.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(t.get("a").unwrap().location, "3.html");
    }

    #[test]
    fn set_kind_ignores_unknown() {
        let mut t = SymbolTable::new();
        t.set_kind("missing", Kind::Enum);
        assert!(t.is_empty());
    }
}
