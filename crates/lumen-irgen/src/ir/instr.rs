//! IR instructions and block terminators

use lumen_ast::{BinaryOperator, UnaryOperator};

use super::{BasicBlockId, FunctionId, VariableId};
use super::value::{Operand, Register};

/// A non-terminating IR instruction.
#[derive(Debug, Clone)]
pub enum Instr {
    /// Raw parameter read: dest = params[index]. Index 0 is the implicit
    /// receiver. Emitted only in the prologue; body code reads parameters
    /// through their frame variable.
    LoadParam {
        /// Result register.
        dest: Register,
        /// Parameter index, receiver included.
        index: u32,
    },

    /// Read the receiver: dest = this
    LoadThis {
        /// Result register.
        dest: Register,
    },

    /// Read new.target: dest = new.target
    GetNewTarget {
        /// Result register.
        dest: Register,
    },

    /// Materialize the arguments object: dest = arguments
    CreateArguments {
        /// Result register.
        dest: Register,
    },

    /// Read a frame variable: dest = var
    LoadVar {
        /// Result register.
        dest: Register,
        /// The variable; may live in an enclosing function's frame.
        var: VariableId,
    },

    /// Write a frame variable: var = value
    StoreVar {
        /// The variable; may live in an enclosing function's frame.
        var: VariableId,
        /// The value stored.
        value: Operand,
    },

    /// Read a global by name: dest = global[name]
    LoadGlobal {
        /// Result register.
        dest: Register,
        /// The global name.
        name: String,
    },

    /// Write a global by name: global[name] = value
    StoreGlobal {
        /// The global name.
        name: String,
        /// The value stored.
        value: Operand,
    },

    /// Delete a global by name: dest = delete global[name]
    DeleteGlobal {
        /// Result register (boolean).
        dest: Register,
        /// The global name.
        name: String,
    },

    /// Property read: dest = object[key]
    LoadProperty {
        /// Result register.
        dest: Register,
        /// The object.
        object: Operand,
        /// The property key (string literal for static access).
        key: Operand,
    },

    /// Property write: object[key] = value
    StoreProperty {
        /// The object.
        object: Operand,
        /// The property key.
        key: Operand,
        /// The value stored.
        value: Operand,
    },

    /// Property delete: dest = delete object[key]
    DeleteProperty {
        /// Result register (boolean).
        dest: Register,
        /// The object.
        object: Operand,
        /// The property key.
        key: Operand,
    },

    /// Unary operation: dest = op operand
    UnaryOp {
        /// Result register.
        dest: Register,
        /// The operator.
        op: UnaryOperator,
        /// The operand.
        operand: Operand,
    },

    /// Binary operation: dest = left op right
    BinaryOp {
        /// Result register.
        dest: Register,
        /// The operator.
        op: BinaryOperator,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },

    /// Call: dest = callee.call(this, args)
    Call {
        /// Result register.
        dest: Register,
        /// The callee value.
        callee: Operand,
        /// The receiver.
        this: Operand,
        /// Arguments in evaluation order.
        args: Vec<Operand>,
    },

    /// Create a closure over the given IR function in the current frame:
    /// dest = closure(function)
    CreateClosure {
        /// Result register.
        dest: Register,
        /// The nested IR function.
        function: FunctionId,
    },

    /// Construct an error object with a fixed message: dest = Error(message)
    NewError {
        /// Result register.
        dest: Register,
        /// The error message.
        message: String,
    },

    /// Begin property enumeration: dest = enum_begin(object)
    EnumBegin {
        /// Result register (the enumerator).
        dest: Register,
        /// The object whose enumerable keys are iterated.
        object: Operand,
    },

    /// Next enumerated key, or undefined when exhausted:
    /// dest = enum_next(iter)
    EnumNext {
        /// Result register.
        dest: Register,
        /// The enumerator produced by EnumBegin.
        iter: Register,
    },

    /// Enter a protected region; control transfers to `handler` if anything
    /// inside throws.
    TryBegin {
        /// The handler block.
        handler: BasicBlockId,
    },

    /// Leave the innermost protected region.
    TryEnd,

    /// Read the caught value at the top of a handler block.
    CatchParam {
        /// Result register.
        dest: Register,
    },
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::LoadParam { dest, index } => write!(f, "{} = param {}", dest, index),
            Instr::LoadThis { dest } => write!(f, "{} = this", dest),
            Instr::GetNewTarget { dest } => write!(f, "{} = new.target", dest),
            Instr::CreateArguments { dest } => write!(f, "{} = arguments", dest),
            Instr::LoadVar { dest, var } => write!(f, "{} = load {}", dest, var),
            Instr::StoreVar { var, value } => write!(f, "store {} -> {}", value, var),
            Instr::LoadGlobal { dest, name } => write!(f, "{} = global {:?}", dest, name),
            Instr::StoreGlobal { name, value } => {
                write!(f, "global {:?} = {}", name, value)
            }
            Instr::DeleteGlobal { dest, name } => {
                write!(f, "{} = delete global {:?}", dest, name)
            }
            Instr::LoadProperty { dest, object, key } => {
                write!(f, "{} = {}[{}]", dest, object, key)
            }
            Instr::StoreProperty { object, key, value } => {
                write!(f, "{}[{}] = {}", object, key, value)
            }
            Instr::DeleteProperty { dest, object, key } => {
                write!(f, "{} = delete {}[{}]", dest, object, key)
            }
            Instr::UnaryOp { dest, op, operand } => {
                write!(f, "{} = {} {}", dest, op, operand)
            }
            Instr::BinaryOp {
                dest,
                op,
                left,
                right,
            } => write!(f, "{} = {} {} {}", dest, left, op, right),
            Instr::Call {
                dest,
                callee,
                this,
                args,
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(
                    f,
                    "{} = call {}, this={}, [{}]",
                    dest,
                    callee,
                    this,
                    args.join(", ")
                )
            }
            Instr::CreateClosure { dest, function } => {
                write!(f, "{} = closure {}", dest, function)
            }
            Instr::NewError { dest, message } => {
                write!(f, "{} = error {:?}", dest, message)
            }
            Instr::EnumBegin { dest, object } => {
                write!(f, "{} = enum_begin {}", dest, object)
            }
            Instr::EnumNext { dest, iter } => write!(f, "{} = enum_next {}", dest, iter),
            Instr::TryBegin { handler } => write!(f, "try_begin handler={}", handler),
            Instr::TryEnd => write!(f, "try_end"),
            Instr::CatchParam { dest } => write!(f, "{} = catch", dest),
        }
    }
}

/// The single control-transfer instruction ending a basic block.
#[derive(Debug, Clone)]
pub enum Terminator {
    /// Unconditional branch.
    Jump {
        /// The successor block.
        target: BasicBlockId,
    },

    /// Conditional branch on truthiness.
    Branch {
        /// The condition value.
        condition: Operand,
        /// Successor when truthy.
        then_block: BasicBlockId,
        /// Successor when falsy.
        else_block: BasicBlockId,
    },

    /// Return a value to the caller.
    Return {
        /// The returned value.
        value: Operand,
    },

    /// Throw a value.
    Throw {
        /// The thrown value.
        value: Operand,
    },

    /// Control never reaches the end of this block.
    Unreachable,
}

impl Terminator {
    /// Successor blocks of this terminator.
    pub fn successors(&self) -> Vec<BasicBlockId> {
        match self {
            Terminator::Jump { target } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Return { .. } | Terminator::Throw { .. } | Terminator::Unreachable => {
                vec![]
            }
        }
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminator::Jump { target } => write!(f, "jump {}", target),
            Terminator::Branch {
                condition,
                then_block,
                else_block,
            } => write!(f, "branch {}, {}, {}", condition, then_block, else_block),
            Terminator::Return { value } => write!(f, "return {}", value),
            Terminator::Throw { value } => write!(f, "throw {}", value),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::value::Literal;

    #[test]
    fn test_instr_display() {
        let i = Instr::BinaryOp {
            dest: Register(2),
            op: BinaryOperator::Add,
            left: Operand::Register(Register(0)),
            right: Operand::Literal(Literal::Number(1.0)),
        };
        assert_eq!(format!("{}", i), "r2 = r0 + 1");
    }

    #[test]
    fn test_terminator_successors() {
        let t = Terminator::Branch {
            condition: Operand::undefined(),
            then_block: BasicBlockId(1),
            else_block: BasicBlockId(2),
        };
        assert_eq!(t.successors(), vec![BasicBlockId(1), BasicBlockId(2)]);
        assert!(Terminator::Unreachable.successors().is_empty());
    }
}
