//! Per-class lowering state.
//!
//! Everything that outlives a single method body but must not be shared
//! between classes: constructor dispatch tables, the names of methods
//! invoked through `super`, and the call-site registry.

use std::collections::BTreeSet;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use callgen_core::{CompilationError, DiagnosticSink, Span, TypeHash};
use callgen_registry::TypeRegistry;

use crate::calls::{ConstructorTable, FingerprintFn, fingerprint};
use crate::collaborators::{CallSiteRegistry, InlineCacheRegistry};

/// State for lowering the methods of one class.
pub struct ClassLowering {
    class: TypeHash,
    constructor_tables: FxHashMap<TypeHash, Rc<ConstructorTable>>,
    reported_collisions: FxHashSet<TypeHash>,
    super_method_names: BTreeSet<String>,
    call_sites: Box<dyn CallSiteRegistry>,
    fingerprint: FingerprintFn,
}

impl ClassLowering {
    pub fn new(class: TypeHash) -> Self {
        Self {
            class,
            constructor_tables: FxHashMap::default(),
            reported_collisions: FxHashSet::default(),
            super_method_names: BTreeSet::new(),
            call_sites: Box::new(InlineCacheRegistry::new()),
            fingerprint,
        }
    }

    pub fn with_call_sites(mut self, call_sites: Box<dyn CallSiteRegistry>) -> Self {
        self.call_sites = call_sites;
        self
    }

    /// Replace the constructor fingerprint function.
    pub fn with_fingerprint(mut self, fingerprint: FingerprintFn) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn class(&self) -> TypeHash {
        self.class
    }

    pub fn call_sites(&self) -> &dyn CallSiteRegistry {
        self.call_sites.as_ref()
    }

    pub(crate) fn call_sites_mut(&mut self) -> &mut dyn CallSiteRegistry {
        self.call_sites.as_mut()
    }

    /// Methods invoked on `super` through dynamic dispatch, sorted.
    pub fn super_method_names(&self) -> impl Iterator<Item = &str> {
        self.super_method_names.iter().map(String::as_str)
    }

    pub(crate) fn record_super_method(&mut self, name: &str) {
        if !self.super_method_names.contains(name) {
            self.super_method_names.insert(name.to_string());
        }
    }

    /// The constructor table for `target`, built on first use.
    pub fn constructor_table(
        &mut self,
        registry: &TypeRegistry,
        target: TypeHash,
        span: Span,
    ) -> Result<Rc<ConstructorTable>, CompilationError> {
        if let Some(table) = self.constructor_tables.get(&target) {
            return Ok(Rc::clone(table));
        }

        let table = Rc::new(ConstructorTable::build_with(
            registry,
            target,
            span,
            self.fingerprint,
        )?);
        self.constructor_tables.insert(target, Rc::clone(&table));
        Ok(table)
    }

    /// Report the fingerprint collisions of `table` to `diagnostics`.
    ///
    /// Only tables that key a runtime switch are reported, at most once per
    /// target class. Lowering continues with the table as is.
    pub fn report_collisions(
        &mut self,
        registry: &TypeRegistry,
        table: &ConstructorTable,
        span: Span,
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        if !table.has_collisions() || !self.reported_collisions.insert(table.class()) {
            return;
        }

        let class_name = registry.type_name(table.class());
        for collision in table.collisions() {
            let first = &table.candidates()[collision.first];
            let second = &table.candidates()[collision.second];
            warn!(
                class = %class_name,
                first = %first.descriptor,
                second = %second.descriptor,
                "constructor fingerprint collision"
            );
            diagnostics.report_error(CompilationError::FingerprintCollision {
                class_name: class_name.clone(),
                first: first.descriptor.clone(),
                second: second.descriptor.clone(),
                span,
            });
        }
    }
}

impl std::fmt::Debug for ClassLowering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLowering")
            .field("class", &self.class)
            .field("constructor_tables", &self.constructor_tables.len())
            .field("super_method_names", &self.super_method_names)
            .field("call_sites", &self.call_sites.site_count())
            .finish()
    }
}
