//! Role declaration model.
//!
//! A builder type describes its callable members as a static list of
//! [`MemberDecl`]s. Each member carries zero or more [`Role`]s (more than one
//! is rejected at scan time) and a [`Signature`] describing what it accepts.
//!
//! ```rust
//! use weave_core::{MemberDecl, RoleKind};
//!
//! #[derive(Default)]
//! struct ItemBuilder { sku: String, qty: u32, tags: Vec<String> }
//!
//! let members = vec![
//!     MemberDecl::text("set_sku", |b: &mut ItemBuilder, v| b.sku = v.to_string())
//!         .attribute("", "sku"),
//!     MemberDecl::parsed("set_qty", |b: &mut ItemBuilder, v: u32| b.qty = v)
//!         .attribute("", "qty"),
//!     MemberDecl::element("add_tag", |b: &mut ItemBuilder, v: String| b.tags.push(v))
//!         .child("", "tag"),
//! ];
//! assert_eq!(members[0].roles()[0].kind(), RoleKind::Attribute);
//! assert_eq!(members[2].roles()[0].kind(), RoleKind::Element);
//! ```

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::InvokeError;
use crate::name::QualifiedName;
use crate::types::TypeKey;

pub(crate) type TextFn = Arc<dyn Fn(&mut dyn Any, &str) -> Result<(), InvokeError> + Send + Sync>;
pub(crate) type ValueFn =
    Arc<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), InvokeError> + Send + Sync>;
pub(crate) type NameFn =
    Arc<dyn Fn(&mut dyn Any, &QualifiedName) -> Result<(), InvokeError> + Send + Sync>;
pub(crate) type NamedTextFn =
    Arc<dyn Fn(&mut dyn Any, &QualifiedName, &str) -> Result<(), InvokeError> + Send + Sync>;

// ── Roles ─────────────────────────────────────────────────────────────────

/// The closed set of structural roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    QualifiedName,
    Attribute,
    AnyAttribute,
    Element,
    AnyElement,
    Content,
    Comment,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoleKind::QualifiedName => "qualified-name",
            RoleKind::Attribute => "attribute",
            RoleKind::AnyAttribute => "any-attribute",
            RoleKind::Element => "element",
            RoleKind::AnyElement => "any-element",
            RoleKind::Content => "content",
            RoleKind::Comment => "comment",
        };
        f.write_str(s)
    }
}

/// A role declaration with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    QualifiedName,
    Attribute(QualifiedName),
    AnyAttribute,
    Element(QualifiedName),
    AnyElement,
    /// `mixed` requests interleaved text and element handling, which is
    /// rejected at scan time.
    Content { mixed: bool },
    Comment,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::QualifiedName => RoleKind::QualifiedName,
            Role::Attribute(_) => RoleKind::Attribute,
            Role::AnyAttribute => RoleKind::AnyAttribute,
            Role::Element(_) => RoleKind::Element,
            Role::AnyElement => RoleKind::AnyElement,
            Role::Content { .. } => RoleKind::Content,
            Role::Comment => RoleKind::Comment,
        }
    }
}

// ── Signatures ────────────────────────────────────────────────────────────

/// What a member accepts.
#[derive(Clone)]
pub enum Signature {
    /// One text value. Fits attribute, content and comment roles.
    Text(TextFn),
    /// One attribute value, passed along with the attribute's name. Fits
    /// attribute roles, and is what wildcard attribute sinks usually want.
    NamedText(NamedTextFn),
    /// One owned child value of type `param`. Fits element roles.
    Value { param: TypeKey, apply: ValueFn },
    /// The element's own qualified name.
    Name(NameFn),
    /// A member that cannot be invoked by a table.
    Opaque { params: Vec<TypeKey> },
}

impl Signature {
    /// Declared formal parameter types.
    pub fn params(&self) -> Vec<TypeKey> {
        match self {
            Signature::Text(_) | Signature::NamedText(_) => vec![TypeKey::of::<String>()],
            Signature::Value { param, .. } => vec![*param],
            Signature::Name(_) => vec![TypeKey::of::<QualifiedName>()],
            Signature::Opaque { params } => params.clone(),
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Text(_) => f.write_str("Text"),
            Signature::NamedText(_) => f.write_str("NamedText"),
            Signature::Value { param, .. } => write!(f, "Value({})", param),
            Signature::Name(_) => f.write_str("Name"),
            Signature::Opaque { params } => f.debug_tuple("Opaque").field(params).finish(),
        }
    }
}

fn downcast<'a, B: Any>(target: &'a mut dyn Any, member: &'static str) -> Result<&'a mut B, InvokeError> {
    target
        .downcast_mut::<B>()
        .ok_or_else(|| InvokeError::BuilderMismatch {
            member,
            expected: TypeKey::of::<B>().short_name(),
        })
}

// ── Member declarations ───────────────────────────────────────────────────

/// One callable member of a builder type.
#[derive(Clone)]
pub struct MemberDecl {
    name: &'static str,
    roles: Vec<Role>,
    builder: Option<TypeKey>,
    signature: Signature,
}

impl MemberDecl {
    pub fn new(name: &'static str, signature: Signature) -> Self {
        MemberDecl {
            name,
            roles: Vec::new(),
            builder: None,
            signature,
        }
    }

    /// A member taking one text value verbatim.
    pub fn text<B, F>(name: &'static str, f: F) -> Self
    where
        B: Any,
        F: Fn(&mut B, &str) + Send + Sync + 'static,
    {
        let apply: TextFn = Arc::new(
            move |target: &mut dyn Any, value: &str| -> Result<(), InvokeError> {
                f(downcast::<B>(target, name)?, value);
                Ok(())
            },
        );
        MemberDecl::new(name, Signature::Text(apply))
    }

    /// A member taking one text value decoded with `FromStr`. Surrounding
    /// whitespace is ignored.
    pub fn parsed<B, T, F>(name: &'static str, f: F) -> Self
    where
        B: Any,
        T: FromStr + 'static,
        T::Err: fmt::Display,
        F: Fn(&mut B, T) + Send + Sync + 'static,
    {
        let apply: TextFn = Arc::new(
            move |target: &mut dyn Any, value: &str| -> Result<(), InvokeError> {
                let builder = downcast::<B>(target, name)?;
                let decoded = value.trim().parse::<T>().map_err(|e| InvokeError::Decode {
                    member: name,
                    value: value.to_string(),
                    message: e.to_string(),
                })?;
                f(builder, decoded);
                Ok(())
            },
        );
        MemberDecl::new(name, Signature::Text(apply))
    }

    /// A member taking an attribute value together with the attribute's name.
    pub fn named_text<B, F>(name: &'static str, f: F) -> Self
    where
        B: Any,
        F: Fn(&mut B, &QualifiedName, &str) + Send + Sync + 'static,
    {
        let apply: NamedTextFn = Arc::new(
            move |target: &mut dyn Any,
                  qname: &QualifiedName,
                  value: &str|
                  -> Result<(), InvokeError> {
                f(downcast::<B>(target, name)?, qname, value);
                Ok(())
            },
        );
        MemberDecl::new(name, Signature::NamedText(apply))
    }

    /// A member taking one fully built child value of type `C`.
    pub fn element<B, C, F>(name: &'static str, f: F) -> Self
    where
        B: Any,
        C: Any,
        F: Fn(&mut B, C) + Send + Sync + 'static,
    {
        let apply: ValueFn = Arc::new(
            move |target: &mut dyn Any, value: Box<dyn Any>| -> Result<(), InvokeError> {
                let builder = downcast::<B>(target, name)?;
                let child = value
                    .downcast::<C>()
                    .map_err(|_| InvokeError::ValueMismatch {
                        member: name,
                        expected: TypeKey::of::<C>().short_name(),
                    })?;
                f(builder, *child);
                Ok(())
            },
        );
        MemberDecl::new(
            name,
            Signature::Value {
                param: TypeKey::of::<C>(),
                apply,
            },
        )
    }

    /// A member receiving the qualified name of the element it is bound to.
    pub fn name<B, F>(name: &'static str, f: F) -> Self
    where
        B: Any,
        F: Fn(&mut B, &QualifiedName) + Send + Sync + 'static,
    {
        let apply: NameFn = Arc::new(
            move |target: &mut dyn Any, qname: &QualifiedName| -> Result<(), InvokeError> {
                f(downcast::<B>(target, name)?, qname);
                Ok(())
            },
        );
        MemberDecl::new(name, Signature::Name(apply))
    }

    /// A member the tables can see but never call.
    pub fn opaque(name: &'static str, params: Vec<TypeKey>) -> Self {
        MemberDecl::new(name, Signature::Opaque { params })
    }

    // ── role setters ──────────────────────────────────────────────────────

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn attribute(self, namespace: &str, local_name: &str) -> Self {
        self.role(Role::Attribute(QualifiedName::new(namespace, local_name)))
    }

    pub fn any_attribute(self) -> Self {
        self.role(Role::AnyAttribute)
    }

    pub fn child(self, namespace: &str, local_name: &str) -> Self {
        self.role(Role::Element(QualifiedName::new(namespace, local_name)))
    }

    pub fn any_element(self) -> Self {
        self.role(Role::AnyElement)
    }

    pub fn content(self) -> Self {
        self.role(Role::Content { mixed: false })
    }

    pub fn mixed_content(self) -> Self {
        self.role(Role::Content { mixed: true })
    }

    pub fn comment(self) -> Self {
        self.role(Role::Comment)
    }

    pub fn qualified_name(self) -> Self {
        self.role(Role::QualifiedName)
    }

    /// Declares the builder type used for this member's child values,
    /// overriding any declaration on the child type itself.
    pub fn with_builder<B: Any>(mut self) -> Self {
        self.builder = Some(TypeKey::of::<B>());
        self
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn member_name(&self) -> &'static str {
        self.name
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn builder(&self) -> Option<TypeKey> {
        self.builder
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Debug for MemberDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDecl")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("builder", &self.builder)
            .field("signature", &self.signature)
            .finish()
    }
}
