use std::collections::HashSet;

/// Number of leading characters that identify a company (the CNPJ "básico").
pub const ROOT_LEN: usize = 8;

/// First `ROOT_LEN` characters of `id`, or the whole string when shorter.
///
/// Counts characters, not bytes, so non-ASCII input never splits a code point.
/// Short identifiers are returned as-is; they are never padded.
pub fn derive_root(id: &str) -> &str {
    match id.char_indices().nth(ROOT_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Clean up a candidate identifier as it comes out of a spreadsheet cell.
///
/// Surrounding whitespace is always trimmed. With `digits_only`, formatting
/// punctuation is dropped too (`11.222.333/0001-81` -> `11222333000181`).
pub fn normalize_identifier(raw: &str, digits_only: bool) -> String {
    let trimmed = raw.trim();
    if digits_only {
        trimmed.chars().filter(|c| c.is_ascii_digit()).collect()
    } else {
        trimmed.to_string()
    }
}

/// Set of identifier roots with constant-time membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: HashSet<String>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set from full identifiers. Duplicate roots collapse.
    pub fn from_identifiers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for id in ids {
            set.insert_identifier(id.as_ref());
        }
        set
    }

    /// Insert the root of `id`. Returns false if that root was already present.
    pub fn insert_identifier(&mut self, id: &str) -> bool {
        let root = derive_root(id);
        if self.roots.contains(root) {
            return false;
        }
        self.roots.insert(root.to_string())
    }

    /// True when the root of `id` is a member.
    ///
    /// Root-level join: `12345678901234` and `12345678000100` both hit root
    /// `12345678`.
    pub fn contains_root_of(&self, id: &str) -> bool {
        self.roots.contains(derive_root(id))
    }

    pub fn contains_root(&self, root: &str) -> bool {
        self.roots.contains(root)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for RootSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_identifiers(iter)
    }
}
