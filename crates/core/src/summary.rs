//! Structural summaries of compiled tables.
//!
//! Invokers are closures and cannot be compared, so two compilations are
//! compared through their summaries instead: same builder types, same names,
//! same members, same sub-table shapes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::table::{ElementBinding, ParsingInfo, SubBinding};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub builder: String,
    /// Attribute name (Clark notation) to member name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_attribute: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub elements: BTreeMap<String, ElementSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_element: Option<ElementSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSummary {
    pub member: String,
    pub table: TableRef,
}

/// A nested table, or a back reference rendered as `"self"` or
/// `"ancestor:<n>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TableRef {
    Table(Box<TableSummary>),
    Cycle(String),
}

impl TableRef {
    pub fn as_table(&self) -> Option<&TableSummary> {
        match self {
            TableRef::Table(summary) => Some(summary),
            TableRef::Cycle(_) => None,
        }
    }
}

impl TableSummary {
    pub fn of(info: &ParsingInfo) -> Self {
        TableSummary {
            builder: info.builder_type().to_string(),
            attributes: info
                .attributes()
                .map(|(name, invoker)| (name.to_string(), invoker.member().to_string()))
                .collect(),
            any_attribute: info.any_attribute().map(|i| i.member().to_string()),
            elements: info
                .elements()
                .map(|(name, binding)| (name.to_string(), ElementSummary::of(binding)))
                .collect(),
            any_element: info.any_element().map(ElementSummary::of),
            content: info.content_invoker().map(|i| i.member().to_string()),
            comment: info.comment_invoker().map(|i| i.member().to_string()),
            qualified_name: info.qualified_name_invoker().map(|i| i.member().to_string()),
        }
    }
}

impl ElementSummary {
    fn of(binding: &ElementBinding) -> Self {
        let table = match &binding.info {
            SubBinding::Compiled(info) => TableRef::Table(Box::new(TableSummary::of(info))),
            SubBinding::SelfRef => TableRef::Cycle("self".to_string()),
            SubBinding::Ancestor(n) => TableRef::Cycle(format!("ancestor:{}", n)),
        };
        ElementSummary {
            member: binding.invoker.member().to_string(),
            table,
        }
    }
}
