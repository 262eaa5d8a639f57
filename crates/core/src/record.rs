use serde::{Deserialize, Serialize};

/// Column layout of the Receita Federal "Empresas" extract, in file order.
pub const DEFAULT_SCHEMA: [&str; 7] = [
    "CNPJ_BÁSICO",
    "RAZÃO_SOCIAL",
    "NATUREZA_JURÍDICA",
    "QUALIFICAÇÃO_DO_RESPONSÁVEL",
    "CAPITAL_SOCIAL_DA_EMPRESA",
    "PORTE_DA_EMPRESA",
    "ENTE_FEDERATIVO_RESPONSÁVEL",
];

/// Columns kept by default when converting to columnar storage.
pub const DEFAULT_PROJECTION: [&str; 2] = ["CNPJ_BÁSICO", "RAZÃO_SOCIAL"];

/// A registry row reduced to the two fields the lookup reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Identifier text as stored (root or full CNPJ); never parsed as a number.
    pub identifier: String,
    pub legal_name: String,
}

impl CompanyRecord {
    pub fn new(identifier: impl Into<String>, legal_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            legal_name: legal_name.into(),
        }
    }

    pub fn root(&self) -> &str {
        crate::root::derive_root(&self.identifier)
    }
}

/// Ordered column names for a headerless source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Vec<String>);

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|c| c == name)
    }

    /// First column name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.0
            .iter()
            .enumerate()
            .find(|(i, c)| self.0[..*i].contains(c))
            .map(|(_, c)| c.as_str())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}
