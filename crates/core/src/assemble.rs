//! Drives compiled tables from a stream of structural events.
//!
//! This is the consumer side of the tables: it does no tokenizing, it only
//! takes already tokenized start/text/comment/end events and turns them into
//! builder calls. One builder instance is created per open element; when the
//! element closes the builder is built and its value handed to the parent's
//! element invoker, or returned when it was the root.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::error::AssembleError;
use crate::invoker::ElementInvoker;
use crate::name::QualifiedName;
use crate::table::{ParsingInfo, RootTables, SubBinding};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub name: QualifiedName,
    pub value: String,
}

/// One structural event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Start {
        name: QualifiedName,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attributes: Vec<Attribute>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    End,
}

impl Event {
    pub fn start(name: QualifiedName) -> Self {
        Event::Start {
            name,
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute to a start event. Other events are returned
    /// unchanged.
    pub fn with_attribute(mut self, name: QualifiedName, value: impl Into<String>) -> Self {
        if let Event::Start { attributes, .. } = &mut self {
            attributes.push(Attribute {
                name,
                value: value.into(),
            });
        }
        self
    }

    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Event::Comment { text: text.into() }
    }
}

/// The chain of tables an element was reached through, innermost first.
/// Back references resolve against this chain rather than against the open
/// element stack, since a back reference can jump over open elements.
struct Scope {
    info: Arc<ParsingInfo>,
    up: Option<Rc<Scope>>,
}

impl Scope {
    fn root(info: Arc<ParsingInfo>) -> Rc<Scope> {
        Rc::new(Scope { info, up: None })
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Option<Rc<Scope>> {
        let mut scope = Rc::clone(self);
        for _ in 0..distance {
            scope = Rc::clone(scope.up.as_ref()?);
        }
        Some(scope)
    }

    fn enter(self: &Rc<Self>, binding: &SubBinding) -> Option<Rc<Scope>> {
        match binding {
            SubBinding::Compiled(info) => Some(Rc::new(Scope {
                info: Arc::clone(info),
                up: Some(Rc::clone(self)),
            })),
            SubBinding::SelfRef => Some(Rc::clone(self)),
            SubBinding::Ancestor(distance) => self.ancestor(*distance),
        }
    }
}

struct Frame {
    name: QualifiedName,
    scope: Rc<Scope>,
    builder: Box<dyn Builder>,
    /// Parent's invoker for this element; `None` for the root.
    invoker: Option<ElementInvoker>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn open(
        name: QualifiedName,
        scope: Rc<Scope>,
        invoker: Option<ElementInvoker>,
        attributes: Vec<Attribute>,
    ) -> Result<Frame, AssembleError> {
        let info = &scope.info;
        let mut builder = info.builder_factory().new_instance();
        if let Some(qname) = info.qualified_name_invoker() {
            qname.invoke(&mut *builder, &name)?;
        }
        for attribute in attributes {
            let invoker = info.attribute_or_any(&attribute.name).ok_or_else(|| {
                AssembleError::UnexpectedAttribute {
                    element: name.to_string(),
                    name: attribute.name.to_string(),
                }
            })?;
            invoker.invoke(&mut *builder, &attribute.name, &attribute.value)?;
        }
        trace!("open {} with {}", name, info.builder_type());
        Ok(Frame {
            name,
            scope,
            builder,
            invoker,
            text: String::new(),
            has_children: false,
        })
    }

    fn push_text(&mut self, text: &str) -> Result<(), AssembleError> {
        if self.has_children && !is_blank(text) {
            return Err(AssembleError::MixedContent(self.name.to_string()));
        }
        self.text.push_str(text);
        Ok(())
    }

    fn close(mut self) -> Result<(Option<ElementInvoker>, Box<dyn Any>), AssembleError> {
        if !self.has_children {
            match self.scope.info.content_invoker() {
                Some(content) => content.invoke(&mut *self.builder, &self.text)?,
                None if !is_blank(&self.text) => {
                    return Err(AssembleError::UnexpectedText(self.name.to_string()))
                }
                None => {}
            }
        }
        trace!("close {}", self.name);
        let value = self.builder.build()?;
        Ok((self.invoker, value))
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Assemble one document from `events` using the root tables.
pub fn assemble(
    tables: &RootTables,
    events: impl IntoIterator<Item = Event>,
) -> Result<Box<dyn Any>, AssembleError> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut result: Option<Box<dyn Any>> = None;

    for event in events {
        match event {
            Event::Start { name, attributes } => {
                if result.is_some() {
                    return Err(AssembleError::Trailing);
                }
                let frame = match stack.last_mut() {
                    None => {
                        let info = tables
                            .get(&name)
                            .ok_or_else(|| AssembleError::UnknownRoot(name.to_string()))?;
                        Frame::open(name, Scope::root(Arc::clone(info)), None, attributes)?
                    }
                    Some(parent) => {
                        if !is_blank(&parent.text) {
                            return Err(AssembleError::MixedContent(parent.name.to_string()));
                        }
                        parent.has_children = true;
                        let binding = parent.scope.info.element_or_any(&name).ok_or_else(|| {
                            AssembleError::UnexpectedElement {
                                parent: parent.name.to_string(),
                                name: name.to_string(),
                            }
                        })?;
                        let scope = parent.scope.enter(&binding.info).ok_or_else(|| {
                            AssembleError::DanglingReference {
                                element: name.to_string(),
                                distance: binding.info.distance().unwrap_or_default(),
                            }
                        })?;
                        let invoker = binding.invoker.clone();
                        Frame::open(name, scope, Some(invoker), attributes)?
                    }
                };
                stack.push(frame);
            }
            Event::Text { text } => match stack.last_mut() {
                Some(frame) => frame.push_text(&text)?,
                None if is_blank(&text) => {}
                None if result.is_some() => return Err(AssembleError::Trailing),
                None => return Err(AssembleError::UnexpectedText("document".to_string())),
            },
            Event::Comment { text } => {
                // Comments outside the root element have nowhere to go.
                if let Some(frame) = stack.last_mut() {
                    if let Some(comment) = frame.scope.info.comment_invoker() {
                        comment.invoke(&mut *frame.builder, &text)?;
                    }
                }
            }
            Event::End => {
                let frame = stack.pop().ok_or(AssembleError::Unbalanced)?;
                let (invoker, value) = frame.close()?;
                match (stack.last_mut(), invoker) {
                    (Some(parent), Some(invoker)) => invoker.invoke(&mut *parent.builder, value)?,
                    _ => result = Some(value),
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(AssembleError::Incomplete(stack.len()));
    }
    result.ok_or(AssembleError::Empty)
}

/// Like [`assemble`], downcasting the root value to `T`.
pub fn assemble_as<T: 'static>(
    tables: &RootTables,
    events: impl IntoIterator<Item = Event>,
) -> Result<T, AssembleError> {
    assemble(tables, events)?
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| AssembleError::OutputMismatch(std::any::type_name::<T>()))
}
