//! Constructor candidate tables for fingerprint dispatch.
//!
//! A table lists a class's declared constructors in descriptor order and
//! assigns each a 32-bit fingerprint of its descriptor. The fingerprints are
//! the keys of the runtime switch that picks a constructor when `this(...)`
//! or `super(...)` cannot be bound statically.

use callgen_core::{CompilationError, ConstructorEntry, Span, TypeHash};
use callgen_registry::TypeRegistry;
use xxhash_rust::xxh64::xxh64;

type Result<T> = std::result::Result<T, CompilationError>;

/// Fingerprint function used to key constructor dispatch.
pub type FingerprintFn = fn(&str) -> i32;

/// Default fingerprint: xxh64 of the descriptor folded to 32 bits.
pub fn fingerprint(descriptor: &str) -> i32 {
    let hash = xxh64(descriptor.as_bytes(), 0);
    (hash ^ (hash >> 32)) as i32
}

/// One dispatchable constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ctor: ConstructorEntry,
    pub descriptor: String,
    pub fingerprint: i32,
}

/// Two candidates (by index into [`ConstructorTable::candidates`]) whose
/// fingerprints are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub first: usize,
    pub second: usize,
}

/// Declared constructors of one class, ordered by descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorTable {
    class: TypeHash,
    candidates: Vec<Candidate>,
    collisions: Vec<Collision>,
}

impl ConstructorTable {
    /// Build the table for `class` with the default fingerprint.
    pub fn build(registry: &TypeRegistry, class: TypeHash, span: Span) -> Result<Self> {
        Self::build_with(registry, class, span, fingerprint)
    }

    /// Build the table for `class` keyed by `fingerprint_fn`.
    pub fn build_with(
        registry: &TypeRegistry,
        class: TypeHash,
        span: Span,
        fingerprint_fn: FingerprintFn,
    ) -> Result<Self> {
        let entry = registry.get(class).ok_or_else(|| CompilationError::UnknownType {
            name: class.to_string(),
            span,
        })?;
        if entry.constructors.is_empty() {
            return Err(CompilationError::NoConstructors {
                class_name: entry.name.clone(),
                span,
            });
        }

        let mut candidates = Vec::with_capacity(entry.constructors.len());
        for ctor in &entry.constructors {
            let descriptor = registry.constructor_descriptor(ctor).ok_or_else(|| {
                CompilationError::UnknownType {
                    name: format!("parameter of {} constructor", entry.name),
                    span,
                }
            })?;
            candidates.push(Candidate {
                ctor: ctor.clone(),
                fingerprint: fingerprint_fn(&descriptor),
                descriptor,
            });
        }
        candidates.sort_by(|a, b| a.descriptor.cmp(&b.descriptor));

        let mut collisions = Vec::new();
        for second in 1..candidates.len() {
            if let Some(first) = candidates[..second]
                .iter()
                .position(|c| c.fingerprint == candidates[second].fingerprint)
            {
                collisions.push(Collision { first, second });
            }
        }

        Ok(Self {
            class,
            candidates,
            collisions,
        })
    }

    pub fn class(&self) -> TypeHash {
        self.class
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }

    /// The single candidate taking exactly `arg_count` parameters.
    ///
    /// `None` if no candidate or more than one has that arity.
    pub fn unique_arity_match(&self, arg_count: usize) -> Option<&Candidate> {
        let mut matches = self
            .candidates
            .iter()
            .filter(|c| c.ctor.params.len() == arg_count);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Switch arms ordered by key. For a duplicated key the candidate first
    /// in descriptor order keeps the arm.
    pub fn switch_arms(&self) -> Vec<&Candidate> {
        let mut arms: Vec<&Candidate> = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            if arms.iter().all(|arm| arm.fingerprint != candidate.fingerprint) {
                arms.push(candidate);
            }
        }
        arms.sort_by_key(|c| c.fingerprint);
        arms
    }
}
