//! The binding table compiler.
//!
//! A scan walks the builder type graph reachable from a set of root types and
//! compiles one [`ParsingInfo`] per root binding. Nested element members get
//! their own compiled sub-tables, except when the child builder type is
//! already being compiled further up: then the sub-binding points back at
//! that table ([`SubBinding::SelfRef`] or [`SubBinding::Ancestor`]) and the
//! walk stops there.
//!
//! A compiled sub-table that refers to nothing above itself is the same
//! wherever its builder and target types occur, so each scan memoizes those
//! and hands one shared `Arc` to every member bound to the same pair.
//!
//! Compilation is all-or-nothing. The first error aborts the scan.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use crate::error::BindingError;
use crate::invoker::{AttributeInvoker, ContentInvoker, ElementInvoker, QualifiedNameInvoker};
use crate::registry::{Registry, RootDecl};
use crate::resolve::{self, BuilderDiscovery, Resolved};
use crate::role::{MemberDecl, Role};
use crate::table::{ElementBinding, ParsingInfo, ParsingInfoBuilder, RootTables, SubBinding};
use crate::types::TypeKey;

/// Per-scan state: builder types of the tables still being compiled,
/// outermost first, and the self-contained tables compiled so far keyed by
/// (builder type, target type). The target matters for the scalar builder,
/// which serves every leaf type with a different factory.
#[derive(Default)]
struct ScanState {
    stack: Vec<TypeKey>,
    shared: HashMap<(TypeKey, TypeKey), Arc<ParsingInfo>>,
}

pub struct Scanner<'r> {
    registry: &'r Registry,
    discovery: &'r dyn BuilderDiscovery,
}

impl<'r> Scanner<'r> {
    /// A scanner whose conventional discovery is the registry's own.
    pub fn new(registry: &'r Registry) -> Self {
        Scanner {
            registry,
            discovery: registry,
        }
    }

    pub fn with_discovery(registry: &'r Registry, discovery: &'r dyn BuilderDiscovery) -> Self {
        Scanner {
            registry,
            discovery,
        }
    }

    /// Compile every root binding declared on `roots`.
    ///
    /// Roots are visited in order; for each type its repeated-group bindings
    /// come before its singular binding. A later binding for an already
    /// compiled name replaces the earlier table.
    pub fn scan(&self, roots: &[TypeKey]) -> Result<RootTables, BindingError> {
        if roots.is_empty() {
            return Err(BindingError::InvalidArgument(
                "root type list is empty".to_string(),
            ));
        }

        let mut result = RootTables::new();
        let mut table = ParsingInfoBuilder::new();
        let mut state = ScanState::default();
        for root in roots {
            let Some(decl) = self.registry.type_decl(*root) else {
                trace!("{}: no root bindings", root);
                continue;
            };
            for binding in decl.roots() {
                table.reset();
                let info = self.scan_root(&mut table, binding, &mut state)?;
                if result.insert(binding.name.clone(), info).is_some() {
                    debug!("root {} redeclared by {}, replacing", binding.name, root);
                }
            }
        }
        debug!("scanned {} root type(s) into {} table(s)", roots.len(), result.len());
        Ok(result)
    }

    /// Compile the table for one builder type directly.
    pub fn scan_builder(&self, builder_type: TypeKey) -> Result<ParsingInfo, BindingError> {
        let factory =
            self.registry
                .factory_for(builder_type)
                .ok_or_else(|| BindingError::ResolutionFailure {
                    target: builder_type.to_string(),
                    reason: "not a registered builder type".to_string(),
                })?;
        let mut table = ParsingInfoBuilder::new();
        self.scan_type(
            &mut table,
            Resolved {
                builder_type,
                factory,
            },
            &mut ScanState::default(),
        )?;
        table.build()
    }

    fn scan_root(
        &self,
        table: &mut ParsingInfoBuilder,
        binding: &RootDecl,
        state: &mut ScanState,
    ) -> Result<ParsingInfo, BindingError> {
        // No scalar fallback for roots.
        let resolved = resolve::builder_for(
            self.registry,
            self.discovery,
            None,
            binding.builder_class,
        )?;
        debug!("root {} -> {}", binding.name, resolved.builder_type);
        self.scan_type(table, resolved, state)?;
        table.build()
    }

    /// Fill `table` with the bindings of one builder type.
    ///
    /// Returns how many levels above this table its back references reach;
    /// zero means the table is self-contained.
    fn scan_type(
        &self,
        table: &mut ParsingInfoBuilder,
        resolved: Resolved,
        state: &mut ScanState,
    ) -> Result<usize, BindingError> {
        let builder_type = resolved.builder_type;
        let decl = self.registry.builder_decl(builder_type).ok_or_else(|| {
            BindingError::ResolutionFailure {
                target: builder_type.to_string(),
                reason: "builder type has no registered members".to_string(),
            }
        })?;
        table
            .set_builder_type(builder_type)
            .set_builder_factory(resolved.factory);

        state.stack.push(builder_type);
        let mut reach = 0;
        for member in &decl.members {
            reach = reach.max(self.scan_member(table, builder_type, member, state)?);
        }
        state.stack.pop();

        debug!("compiled table for {}", builder_type);
        Ok(reach)
    }

    fn scan_member(
        &self,
        table: &mut ParsingInfoBuilder,
        builder_type: TypeKey,
        member: &MemberDecl,
        state: &mut ScanState,
    ) -> Result<usize, BindingError> {
        let role = match member.roles() {
            [] => return Ok(0),
            [role] => role,
            roles => {
                return Err(BindingError::AmbiguousBinding {
                    builder: builder_type.to_string(),
                    member: member.member_name().to_string(),
                    roles: roles
                        .iter()
                        .map(|r| r.kind().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            }
        };
        trace!("{}::{}: {}", builder_type, member.member_name(), role.kind());

        match role {
            Role::QualifiedName => {
                table.set_qualified_name(QualifiedNameInvoker::create(builder_type, member)?);
            }
            Role::Content { mixed: true } => {
                return Err(BindingError::Unsupported {
                    builder: builder_type.to_string(),
                    member: member.member_name().to_string(),
                    feature: "mixed content".to_string(),
                });
            }
            Role::Content { mixed: false } => {
                table.set_content_invoker(ContentInvoker::create(builder_type, member)?);
            }
            Role::Comment => {
                table.set_comment_invoker(ContentInvoker::create(builder_type, member)?);
            }
            Role::Attribute(name) => {
                table.add_attribute(name.clone(), AttributeInvoker::create(builder_type, member)?);
            }
            Role::AnyAttribute => {
                table.set_any_attribute(AttributeInvoker::create(builder_type, member)?);
            }
            Role::Element(name) => {
                let (binding, reach) = self.element_binding(builder_type, member, state)?;
                table.add_element(name.clone(), binding);
                return Ok(reach);
            }
            Role::AnyElement => {
                let (binding, reach) = self.element_binding(builder_type, member, state)?;
                table.set_any_element(binding);
                return Ok(reach);
            }
        }
        Ok(0)
    }

    fn element_binding(
        &self,
        builder_type: TypeKey,
        member: &MemberDecl,
        state: &mut ScanState,
    ) -> Result<(ElementBinding, usize), BindingError> {
        let invoker = ElementInvoker::create(builder_type, member)?;
        let child = invoker.value_type();

        let resolved =
            match resolve::builder_for(self.registry, self.discovery, member.builder(), child) {
                Ok(resolved) => resolved,
                Err(err) => {
                    trace!("{}: {}", child, err);
                    resolve::scalar(self.registry, child)
                }
            };

        let child_type = resolved.builder_type;
        let open = state.stack.iter().rev().position(|open| *open == child_type);
        let (info, reach) = match open {
            Some(0) => (SubBinding::SelfRef, 0),
            Some(distance) => (SubBinding::Ancestor(distance), distance),
            None => match state.shared.get(&(child_type, child)) {
                Some(info) => {
                    trace!("{}: reusing compiled table", child_type);
                    (SubBinding::Compiled(Arc::clone(info)), 0)
                }
                None => {
                    let mut sub = ParsingInfoBuilder::new();
                    let reach = self.scan_type(&mut sub, resolved, state)?;
                    let info = Arc::new(sub.build()?);
                    if reach == 0 {
                        state.shared.insert((child_type, child), Arc::clone(&info));
                    }
                    // One level of the child's reach is this table.
                    (SubBinding::Compiled(info), reach.saturating_sub(1))
                }
            },
        };
        Ok((ElementBinding { info, invoker }, reach))
    }
}
