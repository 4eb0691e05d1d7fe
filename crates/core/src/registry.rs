//! Static declaration registry.
//!
//! Holds everything the scanner needs to know about types without runtime
//! introspection: root bindings, explicit builder declarations, conventional
//! builder associations, builder member tables and scalar decoders. A
//! registry is filled once at startup and then only read.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::builder::{Buildable, ElementBuilder, Factory, ScalarBuilder, ScalarDecoder};
use crate::name::QualifiedName;
use crate::role::MemberDecl;
use crate::types::TypeKey;

/// A root binding: documents whose root element is `name` are built by
/// `builder_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDecl {
    pub name: QualifiedName,
    pub builder_class: TypeKey,
}

impl RootDecl {
    pub fn new<C: 'static>(namespace: &str, local_name: &str) -> Self {
        RootDecl {
            name: QualifiedName::new(namespace, local_name),
            builder_class: TypeKey::of::<C>(),
        }
    }
}

/// Type-level declarations.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub key: TypeKey,
    /// Repeated-group root bindings, scanned first.
    pub root_group: Vec<RootDecl>,
    /// Singular root binding, scanned after the group.
    pub root: Option<RootDecl>,
    /// Explicit builder declaration on the type.
    pub builder: Option<TypeKey>,
    /// Conventional builder association (`Buildable`).
    pub conventional: Option<TypeKey>,
}

impl TypeDecl {
    fn new(key: TypeKey) -> Self {
        TypeDecl {
            key,
            root_group: Vec::new(),
            root: None,
            builder: None,
            conventional: None,
        }
    }

    /// All root bindings in scan order.
    pub fn roots(&self) -> impl Iterator<Item = &RootDecl> {
        self.root_group.iter().chain(self.root.iter())
    }
}

/// Member table of a builder type plus its default factory.
#[derive(Debug, Clone)]
pub struct BuilderDecl {
    pub key: TypeKey,
    /// `None` for builders that only make sense with a target-specific
    /// factory (the scalar builder).
    pub factory: Option<Factory>,
    pub members: Vec<MemberDecl>,
}

pub struct Registry {
    types: HashMap<TypeKey, TypeDecl>,
    builders: HashMap<TypeKey, BuilderDecl>,
    scalars: HashMap<TypeKey, ScalarDecoder>,
}

impl Registry {
    /// A registry knowing the scalar builder and decoders for the standard
    /// leaf types.
    pub fn new() -> Self {
        let mut registry = Registry {
            types: HashMap::new(),
            builders: HashMap::new(),
            scalars: HashMap::new(),
        };
        registry.builders.insert(
            TypeKey::of::<ScalarBuilder>(),
            BuilderDecl {
                key: TypeKey::of::<ScalarBuilder>(),
                factory: None,
                members: ScalarBuilder::members(),
            },
        );
        registry.register_scalar_decoder(ScalarDecoder::verbatim::<String>());
        registry
            .register_scalar::<bool>()
            .register_scalar::<char>()
            .register_scalar::<i8>()
            .register_scalar::<i16>()
            .register_scalar::<i32>()
            .register_scalar::<i64>()
            .register_scalar::<i128>()
            .register_scalar::<isize>()
            .register_scalar::<u8>()
            .register_scalar::<u16>()
            .register_scalar::<u32>()
            .register_scalar::<u64>()
            .register_scalar::<u128>()
            .register_scalar::<usize>()
            .register_scalar::<f32>()
            .register_scalar::<f64>();
        registry
    }

    fn type_entry(&mut self, key: TypeKey) -> &mut TypeDecl {
        self.types.entry(key).or_insert_with(|| TypeDecl::new(key))
    }

    // ── registration ──────────────────────────────────────────────────────

    /// Record the member table and default factory of builder `B`.
    pub fn register_builder<B: ElementBuilder>(&mut self) -> &mut Self {
        let key = TypeKey::of::<B>();
        self.builders.insert(
            key,
            BuilderDecl {
                key,
                factory: Some(Factory::of::<B>()),
                members: B::members(),
            },
        );
        self
    }

    /// Record the conventional association `T -> T::Builder`.
    pub fn register_buildable<T: Buildable>(&mut self) -> &mut Self {
        self.register_builder::<T::Builder>();
        self.type_entry(TypeKey::of::<T>()).conventional = Some(TypeKey::of::<T::Builder>());
        self
    }

    /// Explicitly declare `B` as the builder of `T`.
    pub fn declare_builder<T: 'static, B: ElementBuilder>(&mut self) -> &mut Self {
        self.register_builder::<B>();
        self.type_entry(TypeKey::of::<T>()).builder = Some(TypeKey::of::<B>());
        self
    }

    /// Declare the singular root binding of `T`. A second call replaces the
    /// first.
    pub fn declare_root<T: 'static, C: 'static>(
        &mut self,
        namespace: &str,
        local_name: &str,
    ) -> &mut Self {
        self.type_entry(TypeKey::of::<T>()).root = Some(RootDecl::new::<C>(namespace, local_name));
        self
    }

    /// Append repeated-group root bindings to `T`.
    pub fn declare_root_group<T: 'static>(
        &mut self,
        bindings: impl IntoIterator<Item = RootDecl>,
    ) -> &mut Self {
        self.type_entry(TypeKey::of::<T>()).root_group.extend(bindings);
        self
    }

    pub fn register_scalar<T>(&mut self) -> &mut Self
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        self.register_scalar_decoder(ScalarDecoder::of::<T>())
    }

    pub fn register_scalar_decoder(&mut self, decoder: ScalarDecoder) -> &mut Self {
        self.scalars.insert(decoder.target(), decoder);
        self
    }

    // ── lookup ────────────────────────────────────────────────────────────

    pub fn type_decl(&self, key: TypeKey) -> Option<&TypeDecl> {
        self.types.get(&key)
    }

    pub fn builder_decl(&self, key: TypeKey) -> Option<&BuilderDecl> {
        self.builders.get(&key)
    }

    /// Default factory for a registered builder type.
    pub fn factory_for(&self, key: TypeKey) -> Option<Factory> {
        self.builders.get(&key).and_then(|b| b.factory.clone())
    }

    pub fn scalar_decoder(&self, key: TypeKey) -> Option<ScalarDecoder> {
        self.scalars.get(&key).cloned()
    }

    pub fn is_builder(&self, key: TypeKey) -> bool {
        self.builders.contains_key(&key)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.len())
            .field("builders", &self.builders.len())
            .field("scalars", &self.scalars.len())
            .finish()
    }
}
