//! Builder type and factory resolution.
//!
//! Resolution is an ordered chain of stages, each returning a `Result`:
//!
//! 1. [`explicit`]: a builder declared on the member, else on the target type.
//! 2. [`conventional`]: whatever the configured [`BuilderDiscovery`] finds.
//! 3. [`scalar`]: the generic scalar builder for the target. Never fails.
//!
//! The caller decides whether the last stage applies. Element members fall
//! back to it; root bindings do not.

use log::trace;

use crate::builder::Factory;
use crate::error::BindingError;
use crate::registry::Registry;
use crate::types::TypeKey;

/// A builder type together with a factory producing instances of it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub builder_type: TypeKey,
    pub factory: Factory,
}

/// Conventional discovery of a target type's builder.
pub trait BuilderDiscovery {
    fn discover(&self, target: TypeKey) -> Result<Resolved, BindingError>;
}

/// Finds the `Buildable` association of `target`, or `target` itself when it
/// is a registered builder type.
impl BuilderDiscovery for Registry {
    fn discover(&self, target: TypeKey) -> Result<Resolved, BindingError> {
        if let Some(builder_type) = self.type_decl(target).and_then(|decl| decl.conventional) {
            return registered(self, target, builder_type);
        }
        if let Some(factory) = self.factory_for(target) {
            return Ok(Resolved {
                builder_type: target,
                factory,
            });
        }
        Err(BindingError::ResolutionFailure {
            target: target.to_string(),
            reason: "no builder declared, associated or registered".to_string(),
        })
    }
}

fn registered(
    registry: &Registry,
    target: TypeKey,
    builder_type: TypeKey,
) -> Result<Resolved, BindingError> {
    registry
        .factory_for(builder_type)
        .map(|factory| Resolved {
            builder_type,
            factory,
        })
        .ok_or_else(|| BindingError::ResolutionFailure {
            target: target.to_string(),
            reason: format!("builder type {} is not registered", builder_type),
        })
}

/// Stage 1. `Ok(None)` when neither the member nor the target declares a
/// builder.
pub fn explicit(
    registry: &Registry,
    member_builder: Option<TypeKey>,
    target: TypeKey,
) -> Result<Option<Resolved>, BindingError> {
    let declared =
        member_builder.or_else(|| registry.type_decl(target).and_then(|decl| decl.builder));
    match declared {
        Some(builder_type) => {
            trace!("{}: explicit builder {}", target, builder_type);
            registered(registry, target, builder_type).map(Some)
        }
        None => Ok(None),
    }
}

/// Stage 2.
pub fn conventional(
    discovery: &dyn BuilderDiscovery,
    target: TypeKey,
) -> Result<Resolved, BindingError> {
    let resolved = discovery.discover(target)?;
    trace!("{}: conventional builder {}", target, resolved.builder_type);
    Ok(resolved)
}

/// Stage 3. Compiles even when no decoder is registered for `target`; such a
/// builder fails when it is built.
pub fn scalar(registry: &Registry, target: TypeKey) -> Resolved {
    trace!("{}: scalar fallback", target);
    let factory = Factory::scalar(target, registry.scalar_decoder(target));
    Resolved {
        builder_type: factory.builder_type(),
        factory,
    }
}

/// Stages 1 and 2. Whatever discovery returns must be a builder type the
/// registry has members for, otherwise resolution fails and the caller's
/// fallback (if any) applies.
pub fn builder_for(
    registry: &Registry,
    discovery: &dyn BuilderDiscovery,
    member_builder: Option<TypeKey>,
    target: TypeKey,
) -> Result<Resolved, BindingError> {
    let resolved = match explicit(registry, member_builder, target)? {
        Some(resolved) => resolved,
        None => conventional(discovery, target)?,
    };
    if registry.builder_decl(resolved.builder_type).is_none() {
        return Err(BindingError::ResolutionFailure {
            target: target.to_string(),
            reason: format!("builder type {} has no registered members", resolved.builder_type),
        });
    }
    Ok(resolved)
}
