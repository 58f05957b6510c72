//! Pretty-printing for IR
//!
//! Human-readable output for debugging lowered modules.

use std::fmt::Write;

use super::{BasicBlock, Function, FunctionKind, Module};

/// Trait for pretty-printing IR constructs.
pub trait PrettyPrint {
    /// Render as a human-readable string.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Module {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for (index, func) in self.functions.iter().enumerate() {
            writeln!(output, "; fn{}", index).unwrap();
            output.push_str(&func.pretty_print_in(self));
            writeln!(output).unwrap();
        }
        output
    }
}

impl Function {
    /// Render with variable names resolved through the module arena.
    pub fn pretty_print_in(&self, module: &Module) -> String {
        let mut output = String::new();

        let kind = match self.kind {
            FunctionKind::Function => "function",
            FunctionKind::Arrow => "arrow",
        };
        let params: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        writeln!(
            output,
            "{} {}({}){} {{",
            kind,
            if self.name.is_empty() {
                "<anonymous>"
            } else {
                &self.name
            },
            params.join(", "),
            if self.strict { " strict" } else { "" }
        )
        .unwrap();

        if !self.variables.is_empty() {
            let vars: Vec<String> = self
                .variables
                .iter()
                .map(|v| format!("{} {:?}", v, module.variable(*v).name))
                .collect();
            writeln!(output, "  ; frame: {}", vars.join(", ")).unwrap();
        }

        if let Some(lazy) = &self.lazy {
            writeln!(
                output,
                "  ; lazy stub: buffer {}, {:?}",
                lazy.buffer_id, lazy.node_kind
            )
            .unwrap();
        }

        for block in &self.blocks {
            output.push_str(&block.pretty_print_indented(2));
        }

        writeln!(output, "}}").unwrap();
        output
    }
}

impl BasicBlock {
    fn pretty_print_indented(&self, indent: usize) -> String {
        let mut output = String::new();
        let prefix = " ".repeat(indent);

        writeln!(output, "{}{}:", prefix, self.id).unwrap();
        for instr in &self.instrs {
            writeln!(output, "{}  {}", prefix, instr).unwrap();
        }
        match &self.terminator {
            Some(term) => writeln!(output, "{}  {}", prefix, term).unwrap(),
            None => writeln!(output, "{}  <unterminated>", prefix).unwrap(),
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instr, Literal, Operand, Param, Terminator};
    use lumen_ast::Span;

    #[test]
    fn test_pretty_print_module() {
        let mut module = Module::new();
        let f = module.add_function(Function::new(
            "main",
            FunctionKind::Function,
            true,
            Span::DUMMY,
        ));
        let v = module.add_variable("x", f);
        let func = module.function_mut(f);
        func.params.push(Param::new("this"));
        let entry = func.add_block();
        func.block_mut(entry).add_instr(Instr::StoreVar {
            var: v,
            value: Operand::Literal(Literal::Undefined),
        });
        func.block_mut(entry).set_terminator(Terminator::Return {
            value: Operand::undefined(),
        });

        let text = module.pretty_print();
        assert!(text.contains("function main(this) strict {"));
        assert!(text.contains("bb0:"));
        assert!(text.contains("store undefined -> var0"));
        assert!(text.contains("return undefined"));
    }
}
