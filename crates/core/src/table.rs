//! Binding tables: the compiled, immutable output of a scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::builder::Factory;
use crate::error::BindingError;
use crate::invoker::{AttributeInvoker, ContentInvoker, ElementInvoker, QualifiedNameInvoker};
use crate::name::QualifiedName;
use crate::summary::TableSummary;
use crate::types::TypeKey;

/// The table a nested element is parsed with.
#[derive(Debug, Clone)]
pub enum SubBinding {
    /// An independently compiled table.
    Compiled(Arc<ParsingInfo>),
    /// The child's builder type is the enclosing table's own: reuse the
    /// table currently in use.
    SelfRef,
    /// The child's builder type is that of the table `n` levels above the
    /// enclosing one (`n >= 1`).
    Ancestor(usize),
}

impl SubBinding {
    pub fn is_self(&self) -> bool {
        matches!(self, SubBinding::SelfRef)
    }

    pub fn compiled(&self) -> Option<&Arc<ParsingInfo>> {
        match self {
            SubBinding::Compiled(info) => Some(info),
            _ => None,
        }
    }

    /// How many tables above the enclosing one this binding points to, or
    /// `None` for a compiled table. `SelfRef` is distance 0.
    pub fn distance(&self) -> Option<usize> {
        match self {
            SubBinding::Compiled(_) => None,
            SubBinding::SelfRef => Some(0),
            SubBinding::Ancestor(n) => Some(*n),
        }
    }
}

/// A nested element binding: the table to parse the child with, and the
/// invoker that hands the finished child to the parent builder.
#[derive(Debug, Clone)]
pub struct ElementBinding {
    pub info: SubBinding,
    pub invoker: ElementInvoker,
}

/// Compiled binding table for one builder type.
#[derive(Debug, Clone)]
pub struct ParsingInfo {
    builder_type: TypeKey,
    builder_factory: Factory,
    elements: BTreeMap<QualifiedName, ElementBinding>,
    any_element: Option<ElementBinding>,
    attributes: BTreeMap<QualifiedName, AttributeInvoker>,
    any_attribute: Option<AttributeInvoker>,
    content: Option<ContentInvoker>,
    comment: Option<ContentInvoker>,
    qualified_name: Option<QualifiedNameInvoker>,
}

impl ParsingInfo {
    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    pub fn builder_factory(&self) -> &Factory {
        &self.builder_factory
    }

    pub fn element(&self, name: &QualifiedName) -> Option<&ElementBinding> {
        self.elements.get(name)
    }

    /// Per-name binding, else the wildcard binding.
    pub fn element_or_any(&self, name: &QualifiedName) -> Option<&ElementBinding> {
        self.elements.get(name).or(self.any_element.as_ref())
    }

    pub fn elements(&self) -> impl Iterator<Item = (&QualifiedName, &ElementBinding)> {
        self.elements.iter()
    }

    pub fn any_element(&self) -> Option<&ElementBinding> {
        self.any_element.as_ref()
    }

    pub fn attribute(&self, name: &QualifiedName) -> Option<&AttributeInvoker> {
        self.attributes.get(name)
    }

    /// Per-name invoker, else the wildcard invoker.
    pub fn attribute_or_any(&self, name: &QualifiedName) -> Option<&AttributeInvoker> {
        self.attributes.get(name).or(self.any_attribute.as_ref())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&QualifiedName, &AttributeInvoker)> {
        self.attributes.iter()
    }

    pub fn any_attribute(&self) -> Option<&AttributeInvoker> {
        self.any_attribute.as_ref()
    }

    pub fn content_invoker(&self) -> Option<&ContentInvoker> {
        self.content.as_ref()
    }

    pub fn comment_invoker(&self) -> Option<&ContentInvoker> {
        self.comment.as_ref()
    }

    pub fn qualified_name_invoker(&self) -> Option<&QualifiedNameInvoker> {
        self.qualified_name.as_ref()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary::of(self)
    }
}

// ── ParsingInfoBuilder ────────────────────────────────────────────────────

/// Mutable accumulator for one table. Owned by a single scan frame.
#[derive(Debug, Default)]
pub struct ParsingInfoBuilder {
    builder_type: Option<TypeKey>,
    builder_factory: Option<Factory>,
    elements: BTreeMap<QualifiedName, ElementBinding>,
    any_element: Option<ElementBinding>,
    attributes: BTreeMap<QualifiedName, AttributeInvoker>,
    any_attribute: Option<AttributeInvoker>,
    content: Option<ContentInvoker>,
    comment: Option<ContentInvoker>,
    qualified_name: Option<QualifiedNameInvoker>,
}

impl ParsingInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field for reuse against another root.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn set_builder_type(&mut self, builder_type: TypeKey) -> &mut Self {
        self.builder_type = Some(builder_type);
        self
    }

    pub fn builder_type(&self) -> Option<TypeKey> {
        self.builder_type
    }

    pub fn set_builder_factory(&mut self, factory: Factory) -> &mut Self {
        self.builder_factory = Some(factory);
        self
    }

    /// Registers under `name`; an earlier binding for the same name is
    /// replaced.
    pub fn add_attribute(&mut self, name: QualifiedName, invoker: AttributeInvoker) -> &mut Self {
        self.attributes.insert(name, invoker);
        self
    }

    pub fn set_any_attribute(&mut self, invoker: AttributeInvoker) -> &mut Self {
        self.any_attribute = Some(invoker);
        self
    }

    /// Registers under `name`; an earlier binding for the same name is
    /// replaced.
    pub fn add_element(&mut self, name: QualifiedName, binding: ElementBinding) -> &mut Self {
        self.elements.insert(name, binding);
        self
    }

    pub fn set_any_element(&mut self, binding: ElementBinding) -> &mut Self {
        self.any_element = Some(binding);
        self
    }

    pub fn set_content_invoker(&mut self, invoker: ContentInvoker) -> &mut Self {
        self.content = Some(invoker);
        self
    }

    pub fn set_comment_invoker(&mut self, invoker: ContentInvoker) -> &mut Self {
        self.comment = Some(invoker);
        self
    }

    pub fn set_qualified_name(&mut self, invoker: QualifiedNameInvoker) -> &mut Self {
        self.qualified_name = Some(invoker);
        self
    }

    /// Snapshot the accumulated state into a new immutable table. May be
    /// called repeatedly; every call copies.
    pub fn build(&self) -> Result<ParsingInfo, BindingError> {
        let builder_type = self
            .builder_type
            .ok_or_else(|| BindingError::IncompleteTable("no builder type set".to_string()))?;
        let builder_factory = self.builder_factory.clone().ok_or_else(|| {
            BindingError::IncompleteTable(format!("no builder factory set for {}", builder_type))
        })?;
        Ok(ParsingInfo {
            builder_type,
            builder_factory,
            elements: self.elements.clone(),
            any_element: self.any_element.clone(),
            attributes: self.attributes.clone(),
            any_attribute: self.any_attribute.clone(),
            content: self.content.clone(),
            comment: self.comment.clone(),
            qualified_name: self.qualified_name.clone(),
        })
    }
}

// ── RootTables ────────────────────────────────────────────────────────────

/// Scan output: root element name to compiled table, in first-insertion
/// order. Re-inserting a name replaces its table in place.
#[derive(Debug, Clone, Default)]
pub struct RootTables {
    order: Vec<QualifiedName>,
    tables: HashMap<QualifiedName, Arc<ParsingInfo>>,
}

impl RootTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced table, if any.
    pub fn insert(&mut self, name: QualifiedName, info: ParsingInfo) -> Option<Arc<ParsingInfo>> {
        let previous = self.tables.insert(name.clone(), Arc::new(info));
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&Arc<ParsingInfo>> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &Arc<ParsingInfo>)> {
        self.order
            .iter()
            .filter_map(move |name| self.tables.get(name).map(|info| (name, info)))
    }

    /// Root name and table summary for every root, in order.
    pub fn summaries(&self) -> Vec<(QualifiedName, TableSummary)> {
        self.iter()
            .map(|(name, info)| (name.clone(), info.summary()))
            .collect()
    }
}
