//! Builder traits, factories and the scalar fallback builder.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::BuildError;
use crate::role::MemberDecl;
use crate::types::TypeKey;

/// Object-safe view of a builder instance, as the tables see it.
pub trait Builder: Any {
    /// Convert the filled builder into the value it constructs.
    fn build(self: Box<Self>) -> Result<Box<dyn Any>, BuildError>;

    /// The instance invokers downcast to.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A mutable accumulator with statically declared members.
///
/// `members()` is the role declaration table for the type; it is read once
/// when the type is registered.
pub trait ElementBuilder: Default + 'static {
    type Output: 'static;

    fn members() -> Vec<MemberDecl>;

    fn finish(self) -> Result<Self::Output, BuildError>;
}

impl<B: ElementBuilder> Builder for B {
    fn build(self: Box<Self>) -> Result<Box<dyn Any>, BuildError> {
        let value = (*self).finish()?;
        Ok(Box::new(value))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Conventional association of a value type with the builder that makes it.
pub trait Buildable: 'static {
    type Builder: ElementBuilder<Output = Self>;
}

// ── Factory ───────────────────────────────────────────────────────────────

type MakeFn = Arc<dyn Fn() -> Box<dyn Builder> + Send + Sync>;

/// Produces fresh builder instances of one builder type.
#[derive(Clone)]
pub struct Factory {
    builder_type: TypeKey,
    make: MakeFn,
}

impl Factory {
    /// Factory using the builder's `Default` construction.
    pub fn of<B: ElementBuilder>() -> Self {
        Factory {
            builder_type: TypeKey::of::<B>(),
            make: Arc::new(|| Box::new(B::default()) as Box<dyn Builder>),
        }
    }

    /// Factory for the scalar fallback builder targeting `target`.
    pub fn scalar(target: TypeKey, decoder: Option<ScalarDecoder>) -> Self {
        Factory {
            builder_type: TypeKey::of::<ScalarBuilder>(),
            make: Arc::new(move || {
                Box::new(ScalarBuilder::new(target, decoder.clone())) as Box<dyn Builder>
            }),
        }
    }

    pub fn builder_type(&self) -> TypeKey {
        self.builder_type
    }

    pub fn new_instance(&self) -> Box<dyn Builder> {
        (self.make)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory({})", self.builder_type)
    }
}

// ── Scalar values ─────────────────────────────────────────────────────────

type DecodeFn = Arc<dyn Fn(&str) -> Result<Box<dyn Any>, String> + Send + Sync>;

/// Decodes one text value into an instance of a leaf type.
#[derive(Clone)]
pub struct ScalarDecoder {
    target: TypeKey,
    decode: DecodeFn,
}

impl ScalarDecoder {
    /// Decoder using `FromStr` on the trimmed text.
    pub fn of<T>() -> Self
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        ScalarDecoder {
            target: TypeKey::of::<T>(),
            decode: Arc::new(|text: &str| {
                text.trim()
                    .parse::<T>()
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(|e| e.to_string())
            }),
        }
    }

    /// Decoder using `FromStr` on the untrimmed text.
    pub fn verbatim<T>() -> Self
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        ScalarDecoder {
            target: TypeKey::of::<T>(),
            decode: Arc::new(|text: &str| {
                text.parse::<T>()
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(|e| e.to_string())
            }),
        }
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn decode(&self, text: &str) -> Result<Box<dyn Any>, BuildError> {
        (self.decode)(text).map_err(|message| BuildError::Decode {
            target: self.target.to_string(),
            value: text.to_string(),
            message,
        })
    }
}

impl fmt::Debug for ScalarDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarDecoder({})", self.target)
    }
}

/// Generic builder for leaf values decoded directly from text content.
///
/// One builder type serves every scalar target; the target and decoder are
/// fixed by the factory that created the instance.
pub struct ScalarBuilder {
    target: TypeKey,
    decoder: Option<ScalarDecoder>,
    text: String,
}

impl ScalarBuilder {
    pub fn new(target: TypeKey, decoder: Option<ScalarDecoder>) -> Self {
        ScalarBuilder {
            target,
            decoder,
            text: String::new(),
        }
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn members() -> Vec<MemberDecl> {
        vec![MemberDecl::text("push_text", |b: &mut ScalarBuilder, text| {
            b.text.push_str(text)
        })
        .content()]
    }
}

impl Builder for ScalarBuilder {
    fn build(self: Box<Self>) -> Result<Box<dyn Any>, BuildError> {
        match &self.decoder {
            Some(decoder) => decoder.decode(&self.text),
            None => Err(BuildError::NoDecoder(self.target.to_string())),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
