//! Invokers: pre-resolved capabilities that apply one decoded value to a
//! builder instance.
//!
//! Each invoker is created once at scan time against a fixed
//! (builder type, member) pair. They carry no mutable state, so a compiled
//! table can hand the same invoker to any number of concurrent parses.

use std::fmt;

use crate::builder::Builder;
use crate::error::{BindingError, InvokeError};
use crate::name::QualifiedName;
use crate::role::{MemberDecl, NameFn, NamedTextFn, Signature, TextFn, ValueFn};
use crate::types::TypeKey;

fn wrong_signature(builder_type: TypeKey, member: &MemberDecl, reason: String) -> BindingError {
    BindingError::WrongSignature {
        builder: builder_type.to_string(),
        member: member.member_name().to_string(),
        reason,
    }
}

/// Rejects members that do not declare exactly one formal parameter.
fn check_arity(builder_type: TypeKey, member: &MemberDecl) -> Result<(), BindingError> {
    let params = member.signature().params();
    if params.len() == 1 {
        Ok(())
    } else {
        Err(wrong_signature(
            builder_type,
            member,
            format!("expected exactly one parameter, found {}", params.len()),
        ))
    }
}

fn text_fn(builder_type: TypeKey, member: &MemberDecl) -> Result<TextFn, BindingError> {
    check_arity(builder_type, member)?;
    match member.signature() {
        Signature::Text(apply) => Ok(apply.clone()),
        other => Err(wrong_signature(
            builder_type,
            member,
            format!("expected a text parameter, found {:?}", other),
        )),
    }
}

// ── Attribute ─────────────────────────────────────────────────────────────

#[derive(Clone)]
enum AttributeFn {
    Value(TextFn),
    Named(NamedTextFn),
}

/// Applies a single attribute value.
#[derive(Clone)]
pub struct AttributeInvoker {
    builder_type: TypeKey,
    member: &'static str,
    apply: AttributeFn,
}

impl AttributeInvoker {
    pub fn create(builder_type: TypeKey, member: &MemberDecl) -> Result<Self, BindingError> {
        check_arity(builder_type, member)?;
        let apply = match member.signature() {
            Signature::Text(apply) => AttributeFn::Value(apply.clone()),
            Signature::NamedText(apply) => AttributeFn::Named(apply.clone()),
            other => {
                return Err(wrong_signature(
                    builder_type,
                    member,
                    format!("expected a text parameter, found {:?}", other),
                ))
            }
        };
        Ok(AttributeInvoker {
            builder_type,
            member: member.member_name(),
            apply,
        })
    }

    /// `name` is the attribute actually encountered; only members declared
    /// with [`MemberDecl::named_text`] see it.
    pub fn invoke(
        &self,
        builder: &mut dyn Builder,
        name: &QualifiedName,
        value: &str,
    ) -> Result<(), InvokeError> {
        match &self.apply {
            AttributeFn::Value(apply) => apply(builder.as_any_mut(), value),
            AttributeFn::Named(apply) => apply(builder.as_any_mut(), name, value),
        }
    }

    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    pub fn member(&self) -> &'static str {
        self.member
    }
}

// ── Content / comment ─────────────────────────────────────────────────────

/// Applies accumulated character content. Also used for comments.
#[derive(Clone)]
pub struct ContentInvoker {
    builder_type: TypeKey,
    member: &'static str,
    apply: TextFn,
}

impl ContentInvoker {
    pub fn create(builder_type: TypeKey, member: &MemberDecl) -> Result<Self, BindingError> {
        Ok(ContentInvoker {
            builder_type,
            member: member.member_name(),
            apply: text_fn(builder_type, member)?,
        })
    }

    pub fn invoke(&self, builder: &mut dyn Builder, text: &str) -> Result<(), InvokeError> {
        (self.apply)(builder.as_any_mut(), text)
    }

    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    pub fn member(&self) -> &'static str {
        self.member
    }
}

// ── Element ───────────────────────────────────────────────────────────────

/// Applies a fully built child value. Whether the member appends to a
/// collection or sets a single slot is the member's business.
#[derive(Clone)]
pub struct ElementInvoker {
    builder_type: TypeKey,
    value_type: TypeKey,
    member: &'static str,
    apply: ValueFn,
}

impl ElementInvoker {
    pub fn create(builder_type: TypeKey, member: &MemberDecl) -> Result<Self, BindingError> {
        check_arity(builder_type, member)?;
        match member.signature() {
            Signature::Value { param, apply } => Ok(ElementInvoker {
                builder_type,
                value_type: *param,
                member: member.member_name(),
                apply: apply.clone(),
            }),
            other => Err(wrong_signature(
                builder_type,
                member,
                format!("expected a child value parameter, found {:?}", other),
            )),
        }
    }

    pub fn invoke(
        &self,
        builder: &mut dyn Builder,
        value: Box<dyn std::any::Any>,
    ) -> Result<(), InvokeError> {
        (self.apply)(builder.as_any_mut(), value)
    }

    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    /// The member's parameter type, i.e. the child type.
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    pub fn member(&self) -> &'static str {
        self.member
    }
}

// ── Qualified name ────────────────────────────────────────────────────────

/// Records the name of the element a builder is bound to.
#[derive(Clone)]
pub struct QualifiedNameInvoker {
    builder_type: TypeKey,
    member: &'static str,
    apply: NameFn,
}

impl QualifiedNameInvoker {
    pub fn create(builder_type: TypeKey, member: &MemberDecl) -> Result<Self, BindingError> {
        check_arity(builder_type, member)?;
        match member.signature() {
            Signature::Name(apply) => Ok(QualifiedNameInvoker {
                builder_type,
                member: member.member_name(),
                apply: apply.clone(),
            }),
            other => Err(wrong_signature(
                builder_type,
                member,
                format!("expected a qualified name parameter, found {:?}", other),
            )),
        }
    }

    pub fn invoke(&self, builder: &mut dyn Builder, name: &QualifiedName) -> Result<(), InvokeError> {
        (self.apply)(builder.as_any_mut(), name)
    }

    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    pub fn member(&self) -> &'static str {
        self.member
    }
}

macro_rules! debug_invoker {
    ($($ty:ident),*) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}::{})", stringify!($ty), self.builder_type, self.member)
            }
        }
    )*};
}

debug_invoker!(
    AttributeInvoker,
    ContentInvoker,
    ElementInvoker,
    QualifiedNameInvoker
);
