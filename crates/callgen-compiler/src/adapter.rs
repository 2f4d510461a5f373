//! Runtime support adapters and call flags.
//!
//! Dynamic dispatch and coercions that this core doesn't resolve statically
//! are delegated to adapters provided by the runtime. An adapter call is
//! emitted as `CallAdapter(adapter, count, flags)`.
//!
//! The count operand is the call's argument count for the dispatch adapters
//! (`-1` when the arguments were spread into a vector or the count does not
//! fit the operand). For the support
//! adapters it is the number of stack operands consumed.

use bitflags::bitflags;

/// A runtime support entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Adapter {
    /// Generic dispatch on an arbitrary receiver.
    InvokeMethod = 0,
    /// Dispatch on the current instance (`this`, implicit or explicit).
    InvokeMethodOnCurrent,
    /// Dispatch to the superclass implementation.
    InvokeMethodOnSuper,
    /// Dispatch on a class (static methods).
    InvokeStaticMethod,
    /// Property assignment; takes no sender.
    SetProperty,
    /// `(closure, Object[]) -> Object`
    InvokeClosure,
    /// `(Object[], argCount, Class, candidateCount) -> int` constructor
    /// fingerprint; `argCount` is `-1` for spread arguments.
    SelectConstructor,
    /// `(Object[], fromIndex, Class) -> array` slices trailing varargs.
    CastToVargsArray,
    /// `(Object, Class) -> Object`
    CastToType,
    /// `Object -> Class`
    CastToClass,
    /// `Object -> String`
    CastToString,
    /// `(Object, Class) -> Enum`
    CastToEnum,
    /// `(Object, Class) -> Object` implicit coercion.
    AsType,
    /// `(Object, Class) -> Wrapper` keeps an explicit cast visible to dispatch.
    Wrap,
}

impl Adapter {
    /// Whether the adapter is one of the ordinary method-call adapters that
    /// the inline-cache tier can take over.
    pub fn is_cacheable(self) -> bool {
        matches!(
            self,
            Adapter::InvokeMethod | Adapter::InvokeMethodOnCurrent | Adapter::InvokeStaticMethod
        )
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Flags carried by `CallSite` and `CallAdapter` instructions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u8 {
        /// Safe navigation: a null receiver yields null.
        const SAFE = 1 << 0;
        /// Spread-safe navigation over a collection receiver.
        const SPREAD_SAFE = 1 << 1;
        /// The receiver is an implicit `this`.
        const IMPLICIT_THIS = 1 << 2;
        /// Dispatch on the current instance or its superclass.
        const CURRENT = 1 << 3;
        /// Static dispatch.
        const STATIC = 1 << 4;
        /// Arguments were packed into a single vector operand.
        const SPREAD = 1 << 5;
    }
}
