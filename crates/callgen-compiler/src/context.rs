//! Per-method lowering context and options.

use callgen_core::TypeHash;

/// Knobs for call lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweringOptions {
    /// Static fast path: trust optimizer targets for calls on the current
    /// instance and for direct constructor calls.
    pub fast_path: bool,
    /// Optimizer metadata may turn calls on the current instance into
    /// direct calls.
    pub optimize_for_int: bool,
    /// Largest argument count for which dynamic adapters take the
    /// arguments as separate operands instead of a vector.
    pub max_fixed_args: usize,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            fast_path: false,
            optimize_for_int: true,
            max_fixed_args: 2,
        }
    }
}

/// The method whose body is being lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// The class being compiled.
    pub class: TypeHash,
    /// Lexical `this` type (differs from `class` inside generated closures).
    pub this_type: TypeHash,
    pub is_constructor: bool,
    pub is_static_method: bool,
    /// Static initializer or other code without an instance.
    pub is_static_context: bool,
    /// Inside a compiler-generated function (closure body).
    pub in_generated_function: bool,
    pub options: LoweringOptions,
}

impl Frame {
    /// An instance method of `class`.
    pub fn method(class: TypeHash) -> Self {
        Self {
            class,
            this_type: class,
            is_constructor: false,
            is_static_method: false,
            is_static_context: false,
            in_generated_function: false,
            options: LoweringOptions::default(),
        }
    }

    /// A constructor of `class`.
    pub fn constructor(class: TypeHash) -> Self {
        Self {
            is_constructor: true,
            ..Self::method(class)
        }
    }

    /// A static method of `class`.
    pub fn static_method(class: TypeHash) -> Self {
        Self {
            is_static_method: true,
            is_static_context: true,
            ..Self::method(class)
        }
    }

    pub fn with_this_type(mut self, this_type: TypeHash) -> Self {
        self.this_type = this_type;
        self
    }

    pub fn with_options(mut self, options: LoweringOptions) -> Self {
        self.options = options;
        self
    }

    pub fn generated(mut self) -> Self {
        self.in_generated_function = true;
        self
    }

    /// No instance is available: `this` denotes the class.
    pub fn is_static(&self) -> bool {
        self.is_static_method || self.is_static_context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = LoweringOptions::default();
        assert!(!options.fast_path);
        assert!(options.optimize_for_int);
        assert_eq!(options.max_fixed_args, 2);
    }

    #[test]
    fn frame_kinds() {
        let class = TypeHash::from_name("demo.Widget");
        assert!(Frame::constructor(class).is_constructor);
        assert!(Frame::static_method(class).is_static());
        assert!(!Frame::method(class).is_static());
        assert_eq!(Frame::method(class).this_type, class);
    }
}
