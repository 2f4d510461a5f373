//! Call-expression AST consumed by the lowering core.
//!
//! Upstream passes build these nodes (typically in a bump arena) with types
//! and resolved targets already attached. Only the expression kinds a call
//! needs for its receiver and arguments are modelled; everything else is
//! lowered elsewhere.
//!
//! Call expressions form a closed sum type, [`CallExpr`], so every call kind
//! has exactly one lowering entry point.

use callgen_core::{DataType, Span, TypeHash};

/// An expression in receiver or argument position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'ast str),
    Local(LocalExpr<'ast>),
    /// `this` (the class itself inside static code).
    This,
    Super,
    /// A class literal used as a receiver or value.
    ClassRef(TypeHash),
    Cast(&'ast CastExpr<'ast>),
    /// `*expr` in an argument list.
    Spread(&'ast Expr<'ast>),
    Call(&'ast CallExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Null)
    }

    pub fn is_this(&self) -> bool {
        matches!(self, Expr::This)
    }

    pub fn is_super(&self) -> bool {
        matches!(self, Expr::Super)
    }

    pub fn is_spread(&self) -> bool {
        matches!(self, Expr::Spread(_))
    }
}

/// Whether any argument is a spread expression.
pub fn contains_spread(args: &[Expr<'_>]) -> bool {
    args.iter().any(Expr::is_spread)
}

/// A local variable read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalExpr<'ast> {
    pub name: &'ast str,
    pub slot: u16,
    pub data_type: DataType,
    /// Captured mutable local stored in a shared reference cell.
    pub by_ref: bool,
}

/// An explicit cast `(T) expr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub target: DataType,
    pub expr: Expr<'ast>,
}

/// The method name of a call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message<'ast> {
    Name(&'ast str),
    /// A dynamically computed name (`obj."$name"()`).
    Computed(&'ast Expr<'ast>),
}

impl<'ast> Message<'ast> {
    /// The name, when known at compile time.
    pub fn name(&self) -> Option<&'ast str> {
        match self {
            Message::Name(name) => Some(name),
            Message::Computed(_) => None,
        }
    }
}

/// Every kind of call expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallExpr<'ast> {
    Method(MethodCallExpr<'ast>),
    Static(StaticCallExpr<'ast>),
    Constructor(ConstructorCallExpr<'ast>),
    SpecialConstructor(SpecialConstructorCallExpr<'ast>),
}

impl<'ast> CallExpr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            CallExpr::Method(c) => c.span,
            CallExpr::Static(c) => c.span,
            CallExpr::Constructor(c) => c.span,
            CallExpr::SpecialConstructor(c) => c.span,
        }
    }
}

/// `receiver.message(args)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodCallExpr<'ast> {
    pub receiver: Expr<'ast>,
    pub message: Message<'ast>,
    pub args: &'ast [Expr<'ast>],
    /// `receiver?.m()`
    pub safe: bool,
    /// `receiver*.m()`
    pub spread_safe: bool,
    /// The receiver was not written in source.
    pub implicit_this: bool,
    /// Method the type checker resolved this call to.
    pub method_target: Option<TypeHash>,
    /// Method the optimizer proved this call reaches.
    pub optimized_target: Option<TypeHash>,
    pub span: Span,
}

impl<'ast> MethodCallExpr<'ast> {
    /// A dynamic call by name with no resolved target.
    pub fn new(receiver: Expr<'ast>, name: &'ast str, args: &'ast [Expr<'ast>]) -> Self {
        Self {
            receiver,
            message: Message::Name(name),
            args,
            safe: false,
            spread_safe: false,
            implicit_this: false,
            method_target: None,
            optimized_target: None,
            span: Span::synthetic(),
        }
    }

    /// An unqualified call `name(args)` on the implicit `this`.
    pub fn implicit(name: &'ast str, args: &'ast [Expr<'ast>]) -> Self {
        Self {
            implicit_this: true,
            ..Self::new(Expr::This, name, args)
        }
    }

    pub fn with_target(mut self, method: TypeHash) -> Self {
        self.method_target = Some(method);
        self
    }

    pub fn with_optimized_target(mut self, method: TypeHash) -> Self {
        self.optimized_target = Some(method);
        self
    }

    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }

    pub fn spread_safe(mut self) -> Self {
        self.spread_safe = true;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// `Owner.method(args)` on a statically named class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticCallExpr<'ast> {
    pub owner: TypeHash,
    pub method: &'ast str,
    pub args: &'ast [Expr<'ast>],
    pub optimized_target: Option<TypeHash>,
    pub span: Span,
}

/// `new Class(args)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructorCallExpr<'ast> {
    pub class: TypeHash,
    pub args: &'ast [Expr<'ast>],
    /// Constructor the optimizer proved this call reaches.
    pub optimized_target: Option<TypeHash>,
    /// `class` is a synthetic anonymous subclass declared at this call.
    pub anonymous: bool,
    pub span: Span,
}

/// Which constructor chain a special call enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    This,
    Super,
}

/// `this(args)` or `super(args)` at the start of a constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialConstructorCallExpr<'ast> {
    pub kind: SpecialKind,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}
