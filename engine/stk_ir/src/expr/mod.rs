//! Expression tree.
//!
//! Configuration expressions are small and evaluated many times across
//! stack instances, so they are kept as an immutable boxed tree shared
//! behind the declaration that owns them. Every node carries the [`Span`]
//! of its source text.

use std::fmt;

use stk_value::Value;

use crate::Span;

/// An expression node.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// One static step of a traversal: `.name` or `[literal]`.
#[derive(Clone, PartialEq, Debug)]
pub enum TraverseStep {
    Attr(String),
    Index(Value),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    Literal(Value),
    /// String interpolation; parts are rendered and concatenated.
    Template(Vec<Expr>),
    /// `[a, b]`, evaluates to a tuple.
    List(Vec<Expr>),
    /// `{ a = x }`, evaluates to an object.
    Object(Vec<(String, Expr)>),
    /// A root symbol followed by static steps, e.g. `local.x.y[0]`.
    ///
    /// These are the only nodes that can refer to other declarations.
    Traversal {
        root: String,
        steps: Vec<TraverseStep>,
    },
    GetAttr {
        base: Box<Expr>,
        name: String,
    },
    Index {
        base: Box<Expr>,
        key: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
    /// Source text that failed to parse; evaluating it is an error.
    Invalid(String),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Self::new(ExprKind::Literal(value.into()), Span::DUMMY)
    }

    pub fn template(parts: Vec<Expr>) -> Self {
        Self::new(ExprKind::Template(parts), Span::DUMMY)
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::List(items), Span::DUMMY)
    }

    pub fn object<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        let attrs = attrs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(ExprKind::Object(attrs), Span::DUMMY)
    }

    /// A traversal of attribute names only, e.g. `traversal("local", &["x"])`.
    pub fn traversal(root: &str, attrs: &[&str]) -> Self {
        let steps = attrs
            .iter()
            .map(|name| TraverseStep::Attr((*name).to_owned()))
            .collect();
        Self::new(
            ExprKind::Traversal {
                root: root.to_owned(),
                steps,
            },
            Span::DUMMY,
        )
    }

    pub fn local(name: &str) -> Self {
        Self::traversal("local", &[name])
    }

    pub fn var(name: &str) -> Self {
        Self::traversal("var", &[name])
    }

    #[must_use]
    pub fn attr(self, name: &str) -> Self {
        let span = self.span;
        Self::new(
            ExprKind::GetAttr {
                base: Box::new(self),
                name: name.to_owned(),
            },
            span,
        )
    }

    #[must_use]
    pub fn index(self, key: Expr) -> Self {
        let span = self.span.merge(key.span);
        Self::new(
            ExprKind::Index {
                base: Box::new(self),
                key: Box::new(key),
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let span = operand.span;
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn conditional(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        let span = cond.span.merge(else_expr.span);
        Self::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        )
    }

    pub fn call(func: &str, args: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::Call {
                func: func.to_owned(),
                args,
            },
            Span::DUMMY,
        )
    }

    pub fn invalid(source: impl Into<String>) -> Self {
        Self::new(ExprKind::Invalid(source.into()), Span::DUMMY)
    }
}
