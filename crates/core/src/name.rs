//! Qualified (namespace, local-name) pairs used as table keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A structural name: namespace URI plus local name. The namespace may be
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub local_name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        QualifiedName {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// A name in the empty namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        QualifiedName::new("", local_name)
    }
}

/// Formats in Clark notation: `{namespace}local`, or just `local` when the
/// namespace is empty.
impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}
