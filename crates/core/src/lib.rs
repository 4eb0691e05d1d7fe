#![allow(clippy::result_large_err)]
//! weave-core: declarative binding-table compiler.
//!
//! Builder types declare their members statically, each with at most one
//! structural role (attribute, element, content, comment, qualified name or
//! one of the wildcards). The [`Scanner`] compiles those declarations into
//! immutable, name-indexed [`ParsingInfo`] tables, which [`assemble()`] then
//! drives from a stream of structural [`Event`]s.
//!
//! ```text
//! Registry ──► Scanner ──► RootTables { name → ParsingInfo }
//!   roles        │  resolve: explicit → conventional → scalar
//!   builders     │  cycles:  SelfRef / Ancestor(n)
//!   scalars      ▼
//!             events ──► assemble ──► Box<dyn Any>
//! ```
//!
//! # Public API
//!
//! - [`Registry`] -- static declaration store (roots, builders, scalars)
//! - [`MemberDecl`] / [`Role`] -- per-member role declarations
//! - [`ElementBuilder`] / [`Buildable`] -- the builder traits
//! - [`Scanner`] -- compiles root types into [`RootTables`]
//! - [`ParsingInfo`] / [`SubBinding`] -- compiled tables
//! - [`TableSummary`] -- comparable, serializable table structure
//! - [`assemble()`] / [`assemble_as()`] -- event-driven construction
//! - [`BindingError`], [`InvokeError`], [`BuildError`], [`AssembleError`]

pub mod assemble;
pub mod builder;
pub mod error;
pub mod invoker;
pub mod name;
pub mod registry;
pub mod resolve;
pub mod role;
pub mod scanner;
pub mod summary;
pub mod table;
pub mod types;

// ── Convenience re-exports: key types ────────────────────────────────

pub use builder::{Buildable, Builder, ElementBuilder, Factory, ScalarBuilder, ScalarDecoder};
pub use error::{AssembleError, BindingError, BuildError, InvokeError};
pub use invoker::{AttributeInvoker, ContentInvoker, ElementInvoker, QualifiedNameInvoker};
pub use name::QualifiedName;
pub use registry::{BuilderDecl, Registry, RootDecl, TypeDecl};
pub use resolve::{BuilderDiscovery, Resolved};
pub use role::{MemberDecl, Role, RoleKind, Signature};
pub use summary::{ElementSummary, TableRef, TableSummary};
pub use table::{ElementBinding, ParsingInfo, ParsingInfoBuilder, RootTables, SubBinding};
pub use types::TypeKey;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use assemble::{assemble, assemble_as, Attribute, Event};
pub use scanner::Scanner;
