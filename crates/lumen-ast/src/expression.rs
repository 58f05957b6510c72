//! Expression AST nodes
//!
//! All expression forms the validator and the lowerer understand. Each node
//! carries its source span; the enum is closed, so both passes dispatch with
//! a plain `match` and a generic visit-children default.

use crate::function::{ArrowFunction, FunctionExpression};
use crate::span::Span;

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal: 42, 3.14
    NumberLiteral(NumberLiteral),

    /// String literal: "hello"
    StringLiteral(StringLiteral),

    /// Boolean literal: true, false
    BooleanLiteral(BooleanLiteral),

    /// Null literal
    NullLiteral(Span),

    /// Identifier reference
    Identifier(Identifier),

    /// The `this` receiver
    This(Span),

    /// Assignment: simple `=` or compound `+=` etc.
    Assignment(Box<AssignmentExpression>),

    /// Increment/decrement: ++x, x--
    Update(Box<UpdateExpression>),

    /// Unary operator application, including `delete`, `typeof` and `void`
    Unary(Box<UnaryExpression>),

    /// Binary operator application
    Binary(Box<BinaryExpression>),

    /// Short-circuiting && / ||
    Logical(Box<LogicalExpression>),

    /// Ternary conditional: cond ? a : b
    Conditional(Box<ConditionalExpression>),

    /// Function or method call
    Call(Box<CallExpression>),

    /// Property access: obj.name or obj[expr]
    Member(Box<MemberExpression>),

    /// Function expression
    Function(Box<FunctionExpression>),

    /// Arrow function expression
    Arrow(Box<ArrowFunction>),
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expression::NumberLiteral(e) => e.span,
            Expression::StringLiteral(e) => e.span,
            Expression::BooleanLiteral(e) => e.span,
            Expression::NullLiteral(span) => *span,
            Expression::Identifier(e) => e.span,
            Expression::This(span) => *span,
            Expression::Assignment(e) => e.span,
            Expression::Update(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Logical(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Function(e) => e.span,
            Expression::Arrow(e) => e.span,
        }
    }

    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::NumberLiteral(_)
                | Expression::StringLiteral(_)
                | Expression::BooleanLiteral(_)
                | Expression::NullLiteral(_)
        )
    }
}

/// Numeric literal: 42, 3.14
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    /// The literal value.
    pub value: f64,
    /// Source range.
    pub span: Span,
}

/// String literal: "hello"
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    /// The decoded string value.
    pub value: String,
    /// Source range.
    pub span: Span,
}

/// Boolean literal: true, false
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanLiteral {
    /// The literal value.
    pub value: bool,
    /// Source range.
    pub span: Span,
}

/// Identifier: a name referencing a binding (or a property key)
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The identifier text.
    pub name: String,
    /// Source range.
    pub span: Span,
}

impl Identifier {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Identifier {
            name: name.into(),
            span,
        }
    }
}

/// Assignment expression: `target op value`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator (simple or compound).
    pub op: AssignmentOperator,
    /// The assignment target; must be an l-value.
    pub target: Expression,
    /// The value being assigned.
    pub value: Expression,
    /// Source range.
    pub span: Span,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
}

impl AssignmentOperator {
    /// The underlying binary operator for compound forms, `None` for `=`.
    pub fn binary_op(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubAssign => Some(BinaryOperator::Sub),
            AssignmentOperator::MulAssign => Some(BinaryOperator::Mul),
            AssignmentOperator::DivAssign => Some(BinaryOperator::Div),
            AssignmentOperator::ModAssign => Some(BinaryOperator::Mod),
        }
    }
}

/// Update expression: ++x, x--
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// Increment or decrement.
    pub op: UpdateOperator,
    /// True for prefix position (`++x`), false for postfix (`x++`).
    pub prefix: bool,
    /// The operand; must be an l-value.
    pub argument: Expression,
    /// Source range.
    pub span: Span,
}

/// Update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

/// Unary expression
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator.
    pub op: UnaryOperator,
    /// The operand.
    pub argument: Expression,
    /// Source range.
    pub span: Span,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Numeric negation (-)
    Minus,
    /// Numeric coercion (+)
    Plus,
    /// Logical not (!)
    Not,
    /// Bitwise not (~)
    BitNot,
    /// typeof operator
    Typeof,
    /// void operator
    Void,
    /// delete operator
    Delete,
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Typeof => "typeof",
            UnaryOperator::Void => "void",
            UnaryOperator::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Binary expression
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator.
    pub op: BinaryOperator,
    /// Left operand.
    pub left: Expression,
    /// Right operand.
    pub right: Expression,
    /// Source range.
    pub span: Span,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // Comparison
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `===`
    StrictEqual,
    /// `!==`
    StrictNotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Bitwise
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    UnsignedShiftRight,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::UnsignedShiftRight => ">>>",
        };
        write!(f, "{}", s)
    }
}

/// Logical expression: short-circuiting && / ||
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator.
    pub op: LogicalOperator,
    /// Left operand, always evaluated.
    pub left: Expression,
    /// Right operand, evaluated only if needed.
    pub right: Expression,
    /// Source range.
    pub span: Span,
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// `&&`
    And,
    /// `||`
    Or,
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
        }
    }
}

/// Conditional expression: cond ? consequent : alternate
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition.
    pub condition: Expression,
    /// Value when the condition is truthy.
    pub consequent: Expression,
    /// Value when the condition is falsy.
    pub alternate: Expression,
    /// Source range.
    pub span: Span,
}

/// Call expression: callee(args)
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee; member callees receive their object as the receiver.
    pub callee: Expression,
    /// Argument list in evaluation order.
    pub arguments: Vec<Expression>,
    /// Source range.
    pub span: Span,
}

/// Member expression: obj.name or obj[expr]
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object being accessed.
    pub object: Expression,
    /// The property key.
    pub property: MemberProperty,
    /// Source range.
    pub span: Span,
}

/// Property key of a member expression
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Static name: obj.name
    Static(Identifier),
    /// Computed key: obj[expr]
    Computed(Box<Expression>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_span() {
        let e = Expression::NumberLiteral(NumberLiteral {
            value: 1.0,
            span: Span::new(3, 4),
        });
        assert_eq!(e.span(), Span::new(3, 4));
        assert!(e.is_literal());
    }

    #[test]
    fn test_compound_assignment_op() {
        assert_eq!(AssignmentOperator::Assign.binary_op(), None);
        assert_eq!(
            AssignmentOperator::AddAssign.binary_op(),
            Some(BinaryOperator::Add)
        );
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(format!("{}", BinaryOperator::StrictEqual), "===");
        assert_eq!(format!("{}", UnaryOperator::Typeof), "typeof");
        assert_eq!(format!("{}", LogicalOperator::Or), "||");
    }
}
