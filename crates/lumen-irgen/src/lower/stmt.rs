//! Statement lowering

use lumen_ast::{
    BinaryOperator, ForInTarget, ForInit, Statement, SwitchStatement, TryStatement,
};

use crate::ir::{Instr, Literal, Operand, Terminator};

use super::IrGen;

impl<'a, 'ast> IrGen<'a, 'ast> {
    pub(super) fn lower_stmt(&mut self, stmt: &'ast Statement) {
        // Code after a terminator is unreachable but still lowered; it goes
        // into a fresh block that the epilogue marks unreachable.
        if self.current_block_is_terminated() {
            let dead = self.alloc_block();
            self.switch_to(dead);
        }

        match stmt {
            Statement::VariableDecl(decl) => {
                // Storage was hoisted in the prologue; only initializers
                // execute in place.
                for declarator in &decl.declarators {
                    if let Some(init) = &declarator.init {
                        let value = self.lower_expr(init);
                        self.store_name(&declarator.id.name, value);
                    }
                }
            }
            Statement::FunctionDecl(_) => {
                // Hoisted and generated in the prologue.
            }
            Statement::Expression(es) => {
                self.lower_expr(&es.expression);
            }
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.lower_stmt(stmt);
                }
            }
            Statement::If(s) => {
                let condition = self.lower_expr(&s.condition);
                let then_block = self.alloc_block();
                let cont = self.alloc_block();
                let else_block = if s.else_branch.is_some() {
                    self.alloc_block()
                } else {
                    cont
                };
                self.set_terminator(Terminator::Branch {
                    condition,
                    then_block,
                    else_block,
                });

                self.switch_to(then_block);
                self.lower_stmt(&s.then_branch);
                if !self.current_block_is_terminated() {
                    self.set_terminator(Terminator::Jump { target: cont });
                }

                if let Some(else_branch) = &s.else_branch {
                    self.switch_to(else_block);
                    self.lower_stmt(else_branch);
                    if !self.current_block_is_terminated() {
                        self.set_terminator(Terminator::Jump { target: cont });
                    }
                }
                self.switch_to(cont);
            }
            Statement::While(s) => {
                let cond_block = self.alloc_block();
                let body_block = self.alloc_block();
                let exit_block = self.alloc_block();
                self.register_label_target(&s.label, exit_block, Some(cond_block));

                self.set_terminator(Terminator::Jump { target: cond_block });
                self.switch_to(cond_block);
                let condition = self.lower_expr(&s.condition);
                self.set_terminator(Terminator::Branch {
                    condition,
                    then_block: body_block,
                    else_block: exit_block,
                });

                self.switch_to(body_block);
                self.lower_stmt(&s.body);
                if !self.current_block_is_terminated() {
                    self.set_terminator(Terminator::Jump { target: cond_block });
                }
                self.switch_to(exit_block);
            }
            Statement::DoWhile(s) => {
                let body_block = self.alloc_block();
                let cond_block = self.alloc_block();
                let exit_block = self.alloc_block();
                self.register_label_target(&s.label, exit_block, Some(cond_block));

                self.set_terminator(Terminator::Jump { target: body_block });
                self.switch_to(body_block);
                self.lower_stmt(&s.body);
                if !self.current_block_is_terminated() {
                    self.set_terminator(Terminator::Jump { target: cond_block });
                }

                self.switch_to(cond_block);
                let condition = self.lower_expr(&s.condition);
                self.set_terminator(Terminator::Branch {
                    condition,
                    then_block: body_block,
                    else_block: exit_block,
                });
                self.switch_to(exit_block);
            }
            Statement::For(s) => {
                match &s.init {
                    Some(ForInit::VariableDecl(decl)) => {
                        for declarator in &decl.declarators {
                            if let Some(init) = &declarator.init {
                                let value = self.lower_expr(init);
                                self.store_name(&declarator.id.name, value);
                            }
                        }
                    }
                    Some(ForInit::Expression(expr)) => {
                        self.lower_expr(expr);
                    }
                    None => {}
                }

                let cond_block = self.alloc_block();
                let body_block = self.alloc_block();
                let update_block = self.alloc_block();
                let exit_block = self.alloc_block();
                self.register_label_target(&s.label, exit_block, Some(update_block));

                self.set_terminator(Terminator::Jump { target: cond_block });
                self.switch_to(cond_block);
                match &s.test {
                    Some(test) => {
                        let condition = self.lower_expr(test);
                        self.set_terminator(Terminator::Branch {
                            condition,
                            then_block: body_block,
                            else_block: exit_block,
                        });
                    }
                    None => self.set_terminator(Terminator::Jump { target: body_block }),
                }

                self.switch_to(body_block);
                self.lower_stmt(&s.body);
                if !self.current_block_is_terminated() {
                    self.set_terminator(Terminator::Jump {
                        target: update_block,
                    });
                }

                self.switch_to(update_block);
                if let Some(update) = &s.update {
                    self.lower_expr(update);
                }
                self.set_terminator(Terminator::Jump { target: cond_block });
                self.switch_to(exit_block);
            }
            Statement::ForIn(s) => {
                let object = self.lower_expr(&s.object);
                let iter = self.alloc_register();
                self.emit(Instr::EnumBegin { dest: iter, object });

                let cond_block = self.alloc_block();
                let body_block = self.alloc_block();
                let exit_block = self.alloc_block();
                self.register_label_target(&s.label, exit_block, Some(cond_block));

                self.set_terminator(Terminator::Jump { target: cond_block });
                self.switch_to(cond_block);
                let key = self.alloc_register();
                self.emit(Instr::EnumNext { dest: key, iter });
                // An undefined key signals exhaustion.
                let done = self.alloc_register();
                self.emit(Instr::BinaryOp {
                    dest: done,
                    op: BinaryOperator::StrictEqual,
                    left: Operand::Register(key),
                    right: Operand::Literal(Literal::Undefined),
                });
                self.set_terminator(Terminator::Branch {
                    condition: Operand::Register(done),
                    then_block: exit_block,
                    else_block: body_block,
                });

                self.switch_to(body_block);
                match &s.left {
                    ForInTarget::VariableDecl(decl) => {
                        let declarator = decl
                            .declarators
                            .first()
                            .expect("for-in declaration without declarator");
                        self.store_name(&declarator.id.name, Operand::Register(key));
                    }
                    ForInTarget::Pattern(expr) => {
                        self.lower_assignment_target(expr, Operand::Register(key));
                    }
                }
                self.lower_stmt(&s.body);
                if !self.current_block_is_terminated() {
                    self.set_terminator(Terminator::Jump { target: cond_block });
                }
                self.switch_to(exit_block);
            }
            Statement::Labeled(s) => match s.slot.get() {
                // A slot on the labeled statement itself means a non-loop
                // body with a `break label` somewhere inside. Loop and
                // switch bodies carry the slot on the loop/switch instead
                // and register their own targets.
                Some(_) => {
                    let exit_block = self.alloc_block();
                    self.register_label_target(&s.slot, exit_block, None);
                    self.lower_stmt(&s.body);
                    if !self.current_block_is_terminated() {
                        self.set_terminator(Terminator::Jump { target: exit_block });
                    }
                    self.switch_to(exit_block);
                }
                None => self.lower_stmt(&s.body),
            },
            Statement::Break(s) => {
                let slot = s
                    .target
                    .get()
                    .expect("break target not resolved by validation");
                let target = self.cur().label_targets[slot as usize]
                    .break_block
                    .expect("break target block not registered");
                self.set_terminator(Terminator::Jump { target });
            }
            Statement::Continue(s) => {
                let slot = s
                    .target
                    .get()
                    .expect("continue target not resolved by validation");
                let target = self.cur().label_targets[slot as usize]
                    .continue_block
                    .expect("continue target block not registered");
                self.set_terminator(Terminator::Jump { target });
            }
            Statement::Return(s) => {
                let value = match &s.value {
                    Some(value) => self.lower_expr(value),
                    None => Operand::undefined(),
                };
                self.set_terminator(Terminator::Return { value });
            }
            Statement::Switch(s) => self.lower_switch(s),
            Statement::Try(s) => self.lower_try(s),
            Statement::Throw(s) => {
                let value = self.lower_expr(&s.value);
                self.set_terminator(Terminator::Throw { value });
            }
            Statement::Empty(_) => {}
        }
    }

    /// Case tests run in source order against the saved discriminant; case
    /// bodies fall through to the next body unless terminated.
    fn lower_switch(&mut self, s: &'ast SwitchStatement) {
        let discriminant = self.lower_expr(&s.discriminant);
        let disc_var = self.create_variable("?switch");
        self.emit(Instr::StoreVar {
            var: disc_var,
            value: discriminant,
        });

        let exit_block = self.alloc_block();
        self.register_label_target(&s.label, exit_block, None);

        let body_blocks: Vec<_> = s.cases.iter().map(|_| self.alloc_block()).collect();

        for (index, case) in s.cases.iter().enumerate() {
            let test = match &case.test {
                Some(test) => test,
                None => continue,
            };
            let disc = self.alloc_register();
            self.emit(Instr::LoadVar {
                dest: disc,
                var: disc_var,
            });
            let test_value = self.lower_expr(test);
            let matched = self.alloc_register();
            self.emit(Instr::BinaryOp {
                dest: matched,
                op: BinaryOperator::StrictEqual,
                left: Operand::Register(disc),
                right: test_value,
            });
            let next_test = self.alloc_block();
            self.set_terminator(Terminator::Branch {
                condition: Operand::Register(matched),
                then_block: body_blocks[index],
                else_block: next_test,
            });
            self.switch_to(next_test);
        }

        let default_block = s
            .cases
            .iter()
            .position(|case| case.test.is_none())
            .map(|index| body_blocks[index]);
        self.set_terminator(Terminator::Jump {
            target: default_block.unwrap_or(exit_block),
        });

        for (index, case) in s.cases.iter().enumerate() {
            self.switch_to(body_blocks[index]);
            for stmt in &case.consequent {
                self.lower_stmt(stmt);
            }
            if !self.current_block_is_terminated() {
                let next = body_blocks.get(index + 1).copied().unwrap_or(exit_block);
                self.set_terminator(Terminator::Jump { target: next });
            }
        }
        self.switch_to(exit_block);
    }

    /// The protected body runs between TryBegin/TryEnd markers; the handler
    /// block starts by reading the caught value. The finalizer is lowered
    /// on the normal continuation path.
    fn lower_try(&mut self, s: &'ast TryStatement) {
        if let Some(catch) = &s.catch_clause {
            let handler = self.alloc_block();
            let cont = self.alloc_block();

            self.emit(Instr::TryBegin { handler });
            for stmt in &s.body.statements {
                self.lower_stmt(stmt);
            }
            if !self.current_block_is_terminated() {
                self.emit(Instr::TryEnd);
                self.set_terminator(Terminator::Jump { target: cont });
            }

            self.switch_to(handler);
            let caught = self.alloc_register();
            self.emit(Instr::CatchParam { dest: caught });
            self.scope.push_scope();
            if let Some(param) = &catch.param {
                let var = self.create_variable(&param.name);
                self.scope.declare(&param.name, var);
                self.emit(Instr::StoreVar {
                    var,
                    value: Operand::Register(caught),
                });
            }
            for stmt in &catch.body.statements {
                self.lower_stmt(stmt);
            }
            self.scope.pop_scope();
            if !self.current_block_is_terminated() {
                self.set_terminator(Terminator::Jump { target: cont });
            }
            self.switch_to(cont);
        } else {
            for stmt in &s.body.statements {
                self.lower_stmt(stmt);
            }
        }

        if let Some(finally) = &s.finally_clause {
            for stmt in &finally.statements {
                self.lower_stmt(stmt);
            }
        }
    }
}
