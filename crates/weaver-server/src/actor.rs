//! Identity of the party performing a mutation.
//!
//! Every mutating operation takes an explicit `Actor`; audit columns and
//! transition legality derive from it. Background sweeps run as `System`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A named operator authenticated with an operator key.
    Operator(String),
    /// A host authenticated with its access token; carries the host id.
    Host(String),
    /// Internal maintenance tasks.
    System,
}

impl Actor {
    /// Value recorded in `created_by` / `modified_by` columns.
    pub fn audit_id(&self) -> String {
        match self {
            Self::Operator(name) => format!("operator:{name}"),
            Self::Host(id) => format!("host:{id}"),
            Self::System => "system".to_string(),
        }
    }

    pub const fn is_operator(&self) -> bool {
        matches!(self, Self::Operator(_))
    }

    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.audit_id())
    }
}
