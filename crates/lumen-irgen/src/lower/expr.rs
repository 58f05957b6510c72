//! Expression lowering

use lumen_ast::{
    Expression, LogicalOperator, MemberExpression, MemberProperty, UnaryOperator, UpdateOperator,
};

use crate::ir::{Instr, Literal, Operand, Terminator};

use super::IrGen;

impl<'a, 'ast> IrGen<'a, 'ast> {
    pub(super) fn lower_expr(&mut self, expr: &'ast Expression) -> Operand {
        match expr {
            Expression::NumberLiteral(lit) => Operand::Literal(Literal::Number(lit.value)),
            Expression::StringLiteral(lit) => {
                Operand::Literal(Literal::String(lit.value.clone()))
            }
            Expression::BooleanLiteral(lit) => Operand::Literal(Literal::Bool(lit.value)),
            Expression::NullLiteral(_) => Operand::Literal(Literal::Null),
            Expression::This(_) => self.lower_this(),
            Expression::Identifier(id) => {
                if id.name == "arguments" {
                    return self.lower_arguments();
                }
                self.load_name(&id.name)
            }
            Expression::Assignment(a) => {
                let value = match a.op.binary_op() {
                    None => {
                        let value = self.lower_expr(&a.value);
                        self.lower_assignment_target(&a.target, value.clone());
                        value
                    }
                    Some(op) => match &a.target {
                        Expression::Identifier(id) => {
                            let old = self.load_name(&id.name);
                            let rhs = self.lower_expr(&a.value);
                            let dest = self.alloc_register();
                            self.emit(Instr::BinaryOp {
                                dest,
                                op,
                                left: old,
                                right: rhs,
                            });
                            self.store_name(&id.name, Operand::Register(dest));
                            Operand::Register(dest)
                        }
                        Expression::Member(m) => {
                            let (object, key) = self.lower_member_parts(m);
                            let old = self.alloc_register();
                            self.emit(Instr::LoadProperty {
                                dest: old,
                                object: object.clone(),
                                key: key.clone(),
                            });
                            let rhs = self.lower_expr(&a.value);
                            let dest = self.alloc_register();
                            self.emit(Instr::BinaryOp {
                                dest,
                                op,
                                left: Operand::Register(old),
                                right: rhs,
                            });
                            self.emit(Instr::StoreProperty {
                                object,
                                key,
                                value: Operand::Register(dest),
                            });
                            Operand::Register(dest)
                        }
                        _ => unreachable!("invalid assignment target survived validation"),
                    },
                };
                value
            }
            Expression::Update(u) => {
                let one = Operand::Literal(Literal::Number(1.0));
                let op = match u.op {
                    UpdateOperator::Increment => lumen_ast::BinaryOperator::Add,
                    UpdateOperator::Decrement => lumen_ast::BinaryOperator::Sub,
                };
                match &u.argument {
                    Expression::Identifier(id) => {
                        let old = self.load_name(&id.name);
                        let new = self.alloc_register();
                        self.emit(Instr::BinaryOp {
                            dest: new,
                            op,
                            left: old.clone(),
                            right: one,
                        });
                        self.store_name(&id.name, Operand::Register(new));
                        if u.prefix {
                            Operand::Register(new)
                        } else {
                            old
                        }
                    }
                    Expression::Member(m) => {
                        let (object, key) = self.lower_member_parts(m);
                        let old = self.alloc_register();
                        self.emit(Instr::LoadProperty {
                            dest: old,
                            object: object.clone(),
                            key: key.clone(),
                        });
                        let new = self.alloc_register();
                        self.emit(Instr::BinaryOp {
                            dest: new,
                            op,
                            left: Operand::Register(old),
                            right: one,
                        });
                        self.emit(Instr::StoreProperty {
                            object,
                            key,
                            value: Operand::Register(new),
                        });
                        if u.prefix {
                            Operand::Register(new)
                        } else {
                            Operand::Register(old)
                        }
                    }
                    _ => unreachable!("invalid update target survived validation"),
                }
            }
            Expression::Unary(u) => {
                if u.op == UnaryOperator::Delete {
                    return self.lower_delete(&u.argument);
                }
                let operand = self.lower_expr(&u.argument);
                let dest = self.alloc_register();
                self.emit(Instr::UnaryOp {
                    dest,
                    op: u.op,
                    operand,
                });
                Operand::Register(dest)
            }
            Expression::Binary(b) => {
                let left = self.lower_expr(&b.left);
                let right = self.lower_expr(&b.right);
                let dest = self.alloc_register();
                self.emit(Instr::BinaryOp {
                    dest,
                    op: b.op,
                    left,
                    right,
                });
                Operand::Register(dest)
            }
            Expression::Logical(l) => {
                // Short-circuit through a temporary frame variable; the
                // result is whichever side was last stored.
                let result = self.create_variable("?logical");
                let left = self.lower_expr(&l.left);
                self.emit(Instr::StoreVar {
                    var: result,
                    value: left.clone(),
                });
                let rhs_block = self.alloc_block();
                let cont = self.alloc_block();
                let (then_block, else_block) = match l.op {
                    LogicalOperator::And => (rhs_block, cont),
                    LogicalOperator::Or => (cont, rhs_block),
                };
                self.set_terminator(Terminator::Branch {
                    condition: left,
                    then_block,
                    else_block,
                });

                self.switch_to(rhs_block);
                let right = self.lower_expr(&l.right);
                self.emit(Instr::StoreVar {
                    var: result,
                    value: right,
                });
                self.set_terminator(Terminator::Jump { target: cont });

                self.switch_to(cont);
                let dest = self.alloc_register();
                self.emit(Instr::LoadVar { dest, var: result });
                Operand::Register(dest)
            }
            Expression::Conditional(c) => {
                let result = self.create_variable("?cond");
                let condition = self.lower_expr(&c.condition);
                let then_block = self.alloc_block();
                let else_block = self.alloc_block();
                let cont = self.alloc_block();
                self.set_terminator(Terminator::Branch {
                    condition,
                    then_block,
                    else_block,
                });

                self.switch_to(then_block);
                let value = self.lower_expr(&c.consequent);
                self.emit(Instr::StoreVar { var: result, value });
                self.set_terminator(Terminator::Jump { target: cont });

                self.switch_to(else_block);
                let value = self.lower_expr(&c.alternate);
                self.emit(Instr::StoreVar { var: result, value });
                self.set_terminator(Terminator::Jump { target: cont });

                self.switch_to(cont);
                let dest = self.alloc_register();
                self.emit(Instr::LoadVar { dest, var: result });
                Operand::Register(dest)
            }
            Expression::Call(c) => {
                // Member callees pass their object as the receiver.
                let (callee, this) = match &c.callee {
                    Expression::Member(m) => {
                        let (object, key) = self.lower_member_parts(m);
                        let dest = self.alloc_register();
                        self.emit(Instr::LoadProperty {
                            dest,
                            object: object.clone(),
                            key,
                        });
                        (Operand::Register(dest), object)
                    }
                    callee => (self.lower_expr(callee), Operand::undefined()),
                };
                let args: Vec<Operand> = c
                    .arguments
                    .iter()
                    .map(|arg| self.lower_expr(arg))
                    .collect();
                let dest = self.alloc_register();
                self.emit(Instr::Call {
                    dest,
                    callee,
                    this,
                    args,
                });
                Operand::Register(dest)
            }
            Expression::Member(m) => {
                let (object, key) = self.lower_member_parts(m);
                let dest = self.alloc_register();
                self.emit(Instr::LoadProperty { dest, object, key });
                Operand::Register(dest)
            }
            Expression::Function(f) => {
                // A named function expression sees its own name through a
                // binding in the enclosing frame.
                if let Some(id) = &f.id {
                    self.scope.push_scope();
                    let var = self.create_variable(&id.name);
                    self.scope.declare(&id.name, var);
                    let nested = self
                        .gen_function_like(lumen_ast::FunctionLike::Expression(f), id.name.clone());
                    let dest = self.alloc_register();
                    self.emit(Instr::CreateClosure {
                        dest,
                        function: nested,
                    });
                    self.emit(Instr::StoreVar {
                        var,
                        value: Operand::Register(dest),
                    });
                    self.scope.pop_scope();
                    Operand::Register(dest)
                } else {
                    let nested =
                        self.gen_function_like(lumen_ast::FunctionLike::Expression(f), "");
                    let dest = self.alloc_register();
                    self.emit(Instr::CreateClosure {
                        dest,
                        function: nested,
                    });
                    Operand::Register(dest)
                }
            }
            Expression::Arrow(f) => {
                let nested = self.gen_function_like(lumen_ast::FunctionLike::Arrow(f), "");
                let dest = self.alloc_register();
                self.emit(Instr::CreateClosure {
                    dest,
                    function: nested,
                });
                Operand::Register(dest)
            }
        }
    }

    /// Arrows read the receiver out of the captured slot shared with the
    /// nearest enclosing non-arrow function.
    fn lower_this(&mut self) -> Operand {
        match (self.cur().is_arrow, self.cur().captured_this) {
            (true, Some(var)) => {
                let dest = self.alloc_register();
                self.emit(Instr::LoadVar { dest, var });
                Operand::Register(dest)
            }
            _ => {
                let dest = self.alloc_register();
                self.emit(Instr::LoadThis { dest });
                Operand::Register(dest)
            }
        }
    }

    fn lower_arguments(&mut self) -> Operand {
        if let Some(var) = self.cur().captured_arguments {
            let dest = self.alloc_register();
            self.emit(Instr::LoadVar { dest, var });
            return Operand::Register(dest);
        }
        if self.cur().is_arrow {
            // An arrow with no captured slot: `arguments` is an ordinary
            // name lookup against the enclosing scopes.
            return self.load_name("arguments");
        }
        let dest = self.alloc_register();
        self.emit(Instr::CreateArguments { dest });
        Operand::Register(dest)
    }

    fn lower_delete(&mut self, argument: &'ast Expression) -> Operand {
        match argument {
            Expression::Member(m) => {
                let (object, key) = self.lower_member_parts(m);
                let dest = self.alloc_register();
                self.emit(Instr::DeleteProperty { dest, object, key });
                Operand::Register(dest)
            }
            Expression::Identifier(id) => {
                // Strict mode rejected this in validation. Sloppy mode:
                // frame variables are not deletable, unresolved names
                // delete off the global.
                match self.scope.lookup(&id.name) {
                    Some(_) => Operand::Literal(Literal::Bool(false)),
                    None => {
                        let dest = self.alloc_register();
                        self.emit(Instr::DeleteGlobal {
                            dest,
                            name: id.name.clone(),
                        });
                        Operand::Register(dest)
                    }
                }
            }
            other => {
                // delete of a non-reference evaluates the operand and
                // yields true.
                self.lower_expr(other);
                Operand::Literal(Literal::Bool(true))
            }
        }
    }

    /// Object and key operands of a member access, each evaluated once.
    pub(super) fn lower_member_parts(
        &mut self,
        m: &'ast MemberExpression,
    ) -> (Operand, Operand) {
        let object = self.lower_expr(&m.object);
        let key = match &m.property {
            MemberProperty::Static(id) => Operand::Literal(Literal::String(id.name.clone())),
            MemberProperty::Computed(expr) => self.lower_expr(expr),
        };
        (object, key)
    }

    /// Store into a validated assignment target.
    pub(super) fn lower_assignment_target(&mut self, target: &'ast Expression, value: Operand) {
        match target {
            Expression::Identifier(id) => self.store_name(&id.name, value),
            Expression::Member(m) => {
                let (object, key) = self.lower_member_parts(m);
                self.emit(Instr::StoreProperty { object, key, value });
            }
            _ => unreachable!("invalid assignment target survived validation"),
        }
    }

    /// Read a name: frame variable if bound anywhere on the scope chain,
    /// global otherwise.
    pub(super) fn load_name(&mut self, name: &str) -> Operand {
        match self.scope.lookup(name) {
            Some(var) => {
                let dest = self.alloc_register();
                self.emit(Instr::LoadVar { dest, var });
                Operand::Register(dest)
            }
            None => {
                let dest = self.alloc_register();
                self.emit(Instr::LoadGlobal {
                    dest,
                    name: name.to_string(),
                });
                Operand::Register(dest)
            }
        }
    }

    /// Write a name: frame variable if bound, global otherwise.
    pub(super) fn store_name(&mut self, name: &str, value: Operand) {
        match self.scope.lookup(name) {
            Some(var) => self.emit(Instr::StoreVar { var, value }),
            None => self.emit(Instr::StoreGlobal {
                name: name.to_string(),
                value,
            }),
        }
    }
}
