//! IR values
//!
//! Instruction operands: registers holding instruction results, or inline
//! literal constants. Frame variable reads go through explicit load
//! instructions, so a variable never appears directly as an operand.

/// A virtual register holding one instruction result.
///
/// Numbered per function; there is no register reuse before optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub u32);

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The undefined value.
    Undefined,
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Undefined => write!(f, "undefined"),
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Result of a previous instruction.
    Register(Register),
    /// An inline constant.
    Literal(Literal),
}

impl Operand {
    /// Shorthand for the undefined literal.
    pub fn undefined() -> Self {
        Operand::Literal(Literal::Undefined)
    }
}

impl From<Register> for Operand {
    fn from(r: Register) -> Self {
        Operand::Register(r)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Literal(l) => write!(f, "{}", l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Register(3)), "r3");
        assert_eq!(format!("{}", Operand::undefined()), "undefined");
        assert_eq!(
            format!("{}", Operand::Literal(Literal::String("hi".into()))),
            "\"hi\""
        );
        assert_eq!(format!("{}", Operand::from(Register(0))), "r0");
    }
}
