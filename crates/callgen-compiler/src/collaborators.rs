//! Collaborator interfaces the lowering core consumes.
//!
//! - [`TypeResolver`] - static type of a receiver or argument expression
//! - [`CallSiteRegistry`] - inline-cache slot allocation for the cached tier
//! - [`ClosureConstructorHook`] - constructor chaining inside generated closures
//!
//! Each comes with a default implementation good enough for a standalone
//! compiler and for tests.

use callgen_core::{CompilationError, DataType, primitives};
use callgen_registry::TypeRegistry;

use crate::adapter::CallFlags;
use crate::ast::{CallExpr, Expr, SpecialConstructorCallExpr};
use crate::calls::CallLowering;
use crate::context::Frame;

type Result<T> = std::result::Result<T, CompilationError>;

// ==========================================================================
// Type Resolver
// ==========================================================================

/// Computes the static type of an expression.
pub trait TypeResolver {
    fn resolve_type(&self, expr: &Expr<'_>, frame: &Frame, registry: &TypeRegistry) -> DataType;
}

/// Reads the types upstream passes annotated on the AST.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotatedTypeResolver;

impl TypeResolver for AnnotatedTypeResolver {
    fn resolve_type(&self, expr: &Expr<'_>, frame: &Frame, registry: &TypeRegistry) -> DataType {
        match expr {
            Expr::Null | Expr::Spread(_) => DataType::object(),
            Expr::Bool(_) => DataType::simple(primitives::BOOLEAN),
            Expr::Int(_) => DataType::simple(primitives::INT),
            Expr::Str(_) => DataType::simple(primitives::STRING),
            Expr::Local(local) => local.data_type,
            Expr::This if frame.is_static() => DataType::simple(primitives::CLASS),
            Expr::This => DataType::simple(frame.class),
            Expr::Super => registry
                .get(frame.class)
                .and_then(|entry| entry.super_class)
                .map(DataType::simple)
                .unwrap_or_else(DataType::object),
            Expr::ClassRef(_) => DataType::simple(primitives::CLASS),
            Expr::Cast(cast) => cast.target,
            Expr::Call(call) => match call {
                CallExpr::Method(c) => c
                    .method_target
                    .and_then(|m| registry.method(m))
                    .map(|m| m.return_type)
                    .filter(|ty| !ty.is_void())
                    .unwrap_or_else(DataType::object),
                CallExpr::Static(c) => c
                    .optimized_target
                    .and_then(|m| registry.method(m))
                    .map(|m| m.return_type)
                    .filter(|ty| !ty.is_void())
                    .unwrap_or_else(DataType::object),
                CallExpr::Constructor(c) => DataType::simple(c.class),
                CallExpr::SpecialConstructor(_) => DataType::object(),
            },
        }
    }
}

// ==========================================================================
// Call-Site Registry
// ==========================================================================

/// Owns the inline-cache slots backing the cached tier.
pub trait CallSiteRegistry {
    /// Allocate the slot for one call site invoking `name`.
    fn make_call_site(&mut self, name: &str, flags: CallFlags) -> Result<u16>;

    /// Name a slot was allocated for.
    fn site_name(&self, slot: u16) -> Option<&str>;

    fn site_flags(&self, slot: u16) -> Option<CallFlags>;

    fn site_count(&self) -> usize;
}

/// One slot per call site, in allocation order.
#[derive(Debug, Default, Clone)]
pub struct InlineCacheRegistry {
    sites: Vec<(String, CallFlags)>,
}

impl InlineCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all allocated sites in slot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|(name, _)| name.as_str())
    }
}

impl CallSiteRegistry for InlineCacheRegistry {
    fn make_call_site(&mut self, name: &str, flags: CallFlags) -> Result<u16> {
        let slot = u16::try_from(self.sites.len())
            .map_err(|_| CompilationError::internal("call-site table exceeds u16 slots"))?;
        self.sites.push((name.to_string(), flags));
        Ok(slot)
    }

    fn site_name(&self, slot: u16) -> Option<&str> {
        self.sites.get(slot as usize).map(|(name, _)| name.as_str())
    }

    fn site_flags(&self, slot: u16) -> Option<CallFlags> {
        self.sites.get(slot as usize).map(|(_, flags)| *flags)
    }

    fn site_count(&self) -> usize {
        self.sites.len()
    }
}

// ==========================================================================
// Closure Constructor Hook
// ==========================================================================

/// Lets the closure machinery take over `this(...)`/`super(...)` calls made
/// from a generated closure class.
pub trait ClosureConstructorHook {
    /// Returns `Ok(true)` if the call was fully lowered.
    fn lower_special_constructor(
        &self,
        call: &SpecialConstructorCallExpr<'_>,
        lowering: &mut CallLowering<'_, '_>,
    ) -> Result<bool>;
}

/// Never handles anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClosureHook;

impl ClosureConstructorHook for NoClosureHook {
    fn lower_special_constructor(
        &self,
        _call: &SpecialConstructorCallExpr<'_>,
        _lowering: &mut CallLowering<'_, '_>,
    ) -> Result<bool> {
        Ok(false)
    }
}
