use crate::{
    bytecode::{
        compile_error::CompileError,
        ir::{Instr, Label, LabelAllocator, Operand},
        link::{CompileOptions, FunctionTable},
        op::{BOS, FIRST_VAR, HALT, IO, MAX_INT, Opcode, PC, var_register},
        validate::{CheckedFunction, INPUT, OUTPUT, literal_word},
    },
    lang::{BinaryOp, Call, Expr, Stmt, UnaryOp},
};

/// Words the callee's epilogue pops on top of its arguments: the saved
/// stack base and the return address.
pub const FRAME_WORDS: i32 = 2;

/// Translates one validated function into an unpositioned instruction list.
///
/// `depth` is the static operand stack depth relative to the function's own
/// frame. Every statement leaves it unchanged and every expression raises it
/// by exactly one.
pub struct FunctionCompiler<'a> {
    function: &'a CheckedFunction<'a>,
    table: &'a FunctionTable,
    labels: &'a mut LabelAllocator,
    options: &'a CompileOptions,

    entry: Label,
    ret: Label,

    out: Vec<Instr>,
    depth: i32,
}

impl<'a> FunctionCompiler<'a> {
    pub fn new(
        function: &'a CheckedFunction<'a>,
        table: &'a FunctionTable,
        labels: &'a mut LabelAllocator,
        options: &'a CompileOptions,
    ) -> Result<Self, CompileError> {
        let entry = table
            .get(function.name())
            .map(|callee| callee.entry)
            .ok_or_else(|| {
                CompileError::internal(format!("function {} missing from table", function.name()))
            })?;
        let ret = labels.fresh();

        Ok(Self {
            function,
            table,
            labels,
            options,
            entry,
            ret,
            out: Vec::new(),
            depth: 0,
        })
    }

    pub fn compile(mut self) -> Result<Vec<Instr>, CompileError> {
        // arguments are already on the stack
        let params = self.function.signature.params;
        self.depth = params as i32;

        self.emit(Instr::marker(self.entry))?;
        for i in (0..params).rev() {
            self.emit(Instr::with(Opcode::Pop, var_register(i)))?;
        }

        for stmt in &self.function.decl.body {
            self.compile_stmt(stmt)?;
        }

        self.emit(Instr::marker(self.ret))?;
        self.emit_epilogue()?;

        Ok(self.out)
    }

    fn name(&self) -> &str {
        self.function.name()
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_stmt(s)?;
                }
                Ok(())
            }

            Stmt::Local(decl) => match decl.declarators.as_slice() {
                [declarator] => match &declarator.init {
                    Some(init) => self.compile_assignment(&declarator.name, init),
                    None => Err(self.unvalidated(stmt)),
                },
                _ => Err(self.unvalidated(stmt)),
            },

            Stmt::Expr(Expr::Assign { target, value, .. }) => {
                self.compile_assignment(target, value)
            }
            Stmt::Expr(Expr::Call(call)) if call.name == OUTPUT => self.compile_output(call),
            Stmt::Expr(Expr::Call(call)) if call.name != INPUT => self.compile_call(call, false),
            Stmt::Expr(_) => Err(self.unvalidated(stmt)),

            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let if_end = self.labels.fresh();

                self.compile_expr(cond)?;
                self.emit_jump_if_zero(if_end)?;
                self.compile_stmt(then)?;

                match otherwise {
                    None => self.emit(Instr::marker(if_end)),
                    Some(otherwise) => {
                        let else_end = self.labels.fresh();
                        self.emit_jump(Operand::Label(else_end))?;
                        self.emit(Instr::marker(if_end))?;
                        self.compile_stmt(otherwise)?;
                        self.emit(Instr::marker(else_end))
                    }
                }
            }

            Stmt::While { cond, body } => {
                let start = self.labels.fresh();
                let end = self.labels.fresh();

                self.emit(Instr::marker(start))?;
                self.compile_expr(cond)?;
                self.emit_jump_if_zero(end)?;
                self.compile_stmt(body)?;
                self.emit_jump(Operand::Label(start))?;
                self.emit(Instr::marker(end))
            }

            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.compile_expr(value)?;
                    self.emit(Instr::with(Opcode::Pop, IO))?;
                }
                self.emit_jump(Operand::Label(self.ret))
            }
        }
    }

    fn compile_assignment(&mut self, name: &str, value: &Expr) -> Result<(), CompileError> {
        let reg = self.register_of(name)?;
        self.compile_expr(value)?;
        self.emit(Instr::with(Opcode::Pop, reg))
    }

    /// `output(x, y, v)`: x and y stay on the stack, v goes through IO.
    fn compile_output(&mut self, call: &Call) -> Result<(), CompileError> {
        let [x, y, v] = call.args.as_slice() else {
            return Err(self.unvalidated(call));
        };
        self.compile_expr(x)?;
        self.compile_expr(y)?;
        self.compile_expr(v)?;
        self.emit(Instr::with(Opcode::Pop, IO))?;
        self.emit(Instr::new(Opcode::Output))
    }

    fn compile_input(&mut self, call: &Call) -> Result<(), CompileError> {
        let [x, y] = call.args.as_slice() else {
            return Err(self.unvalidated(call));
        };
        self.compile_expr(x)?;
        self.compile_expr(y)?;
        self.emit(Instr::new(Opcode::Input))?;
        self.emit(Instr::with(Opcode::Push, IO))
    }

    /// Calling sequence for a user function.
    ///
    /// ```text
    ///   PUSH top .. PUSH 3       save the variable window, highest first
    ///   CONST <resume>           return address
    ///   PUSH BOS                 caller's frame base
    ///   <args>                   in declaration order
    ///   PUSH BOS; CONST off; ADD; POP BOS
    ///   CONST <entry>; POP PC
    /// resume:
    ///   POP 3 .. POP top
    ///   PUSH IO                  only when the value is used
    /// ```
    fn compile_call(&mut self, call: &Call, as_value: bool) -> Result<(), CompileError> {
        let callee = self
            .table
            .get(&call.name)
            .ok_or_else(|| CompileError::undeclared_function(self.name(), call))?;
        if as_value && !callee.returns_value {
            return Err(CompileError::void_in_expression(self.name(), call));
        }
        if call.args.len() != callee.params {
            return Err(CompileError::wrong_arity(self.name(), call, callee.params));
        }
        let (params, entry) = (callee.params as i32, callee.entry);

        let top = var_register(self.function.variables.len()) - 1;
        for reg in (FIRST_VAR..=top).rev() {
            self.emit(Instr::with(Opcode::Push, reg))?;
        }

        let resume = self.labels.fresh();
        self.emit(Instr::address_of(resume))?;
        self.emit(Instr::with(Opcode::Push, BOS))?;

        let bos_offset = self.depth;
        for arg in &call.args {
            self.compile_expr(arg)?;
        }

        self.emit(Instr::with(Opcode::Push, BOS))?;
        self.emit(Instr::with(Opcode::Const, bos_offset))?;
        self.emit(Instr::new(Opcode::Add))?;
        self.emit(Instr::with(Opcode::Pop, BOS))?;

        self.emit_jump(Operand::Label(entry))?;
        self.emit(Instr::marker(resume))?;

        // The callee's prologue and epilogue consumed these.
        self.depth -= params + FRAME_WORDS;

        for reg in FIRST_VAR..=top {
            self.emit(Instr::with(Opcode::Pop, reg))?;
        }

        if as_value {
            self.emit(Instr::with(Opcode::Push, IO))?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Paren(inner) => self.compile_expr(inner),

            Expr::Int(n) => {
                let word = literal_word(*n)
                    .ok_or_else(|| CompileError::literal_out_of_range(self.name(), *n))?;
                self.emit(Instr::with(Opcode::Const, word))
            }

            Expr::Var(name) => {
                let reg = self.register_of(name)?;
                self.emit(Instr::with(Opcode::Push, reg))
            }

            Expr::Unary { op, operand } => {
                self.compile_expr(operand)?;
                match op {
                    UnaryOp::Neg => self.emit_negate(),
                    UnaryOp::Not => self.emit_logical_not(),
                    UnaryOp::Complement => self.emit(Instr::new(Opcode::Not)),
                }
            }

            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => self.compile_and(lhs, rhs),
            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => self.compile_or(lhs, rhs),
            Expr::Binary { op, lhs, rhs } => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.emit_binary(expr, *op)
            }

            Expr::Call(call) if call.name == INPUT => self.compile_input(call),
            Expr::Call(call) if call.name != OUTPUT => self.compile_call(call, true),

            Expr::Call(_) | Expr::Assign { .. } => Err(self.unvalidated(expr)),
        }
    }

    /// Both operands are already on the stack.
    fn emit_binary(&mut self, expr: &Expr, op: BinaryOp) -> Result<(), CompileError> {
        match op {
            BinaryOp::BitOr => self.emit(Instr::new(Opcode::Or)),
            BinaryOp::BitAnd => self.emit(Instr::new(Opcode::And)),
            BinaryOp::BitXor => self.emit(Instr::new(Opcode::Xor)),
            BinaryOp::Shl => self.emit(Instr::new(Opcode::LShift)),
            BinaryOp::Shr => self.emit(Instr::new(Opcode::RShift)),
            BinaryOp::Add => self.emit(Instr::new(Opcode::Add)),
            BinaryOp::Mul => self.emit(Instr::new(Opcode::Mult)),
            BinaryOp::Eq => self.emit(Instr::new(Opcode::Equals)),
            BinaryOp::Lt => self.emit(Instr::new(Opcode::LessThan)),

            // a - b == a + -b
            BinaryOp::Sub => {
                self.emit_negate()?;
                self.emit(Instr::new(Opcode::Add))
            }
            // a != b == !(a == b)
            BinaryOp::Ne => {
                self.emit(Instr::new(Opcode::Equals))?;
                self.emit_logical_not()
            }
            // a <= b == a < b + 1
            BinaryOp::Le => {
                self.emit_add_one()?;
                self.emit(Instr::new(Opcode::LessThan))
            }
            // a > b == !(a < b + 1)
            BinaryOp::Gt => {
                self.emit_add_one()?;
                self.emit(Instr::new(Opcode::LessThan))?;
                self.emit_logical_not()
            }
            // a >= b == !(a < b)
            BinaryOp::Ge => {
                self.emit(Instr::new(Opcode::LessThan))?;
                self.emit_logical_not()
            }

            BinaryOp::And | BinaryOp::Or | BinaryOp::Div | BinaryOp::Rem | BinaryOp::UShr => {
                Err(self.unvalidated(expr))
            }
        }
    }

    /// ```text
    ///   <lhs>; jump-if-zero halfway
    ///   <rhs>; jump end
    /// halfway:
    ///   CONST 0
    /// end:
    /// ```
    fn compile_and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
        let halfway = self.labels.fresh();
        let end = self.labels.fresh();

        self.compile_expr(lhs)?;
        self.emit_jump_if_zero(halfway)?;
        self.compile_expr(rhs)?;
        self.emit_jump(Operand::Label(end))?;
        self.emit(Instr::marker(halfway))?;
        self.emit(Instr::with(Opcode::Const, 0))?;
        self.emit(Instr::marker(end))?;

        // only one of the two arms runs
        self.depth -= 1;
        Ok(())
    }

    /// ```text
    ///   <lhs>; jump-if-zero halfway
    ///   CONST 1; jump end
    /// halfway:
    ///   <rhs>
    /// end:
    /// ```
    fn compile_or(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
        let halfway = self.labels.fresh();
        let end = self.labels.fresh();

        self.compile_expr(lhs)?;
        self.emit_jump_if_zero(halfway)?;
        self.emit(Instr::with(Opcode::Const, 1))?;
        self.emit_jump(Operand::Label(end))?;
        self.emit(Instr::marker(halfway))?;
        self.compile_expr(rhs)?;
        self.emit(Instr::marker(end))?;

        self.depth -= 1;
        Ok(())
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    fn emit_add_one(&mut self) -> Result<(), CompileError> {
        self.emit(Instr::with(Opcode::Const, 1))?;
        self.emit(Instr::new(Opcode::Add))
    }

    /// Multiply by -1, written as its 16-bit image.
    fn emit_negate(&mut self) -> Result<(), CompileError> {
        self.emit(Instr::with(Opcode::Const, MAX_INT))?;
        self.emit(Instr::new(Opcode::Mult))
    }

    fn emit_logical_not(&mut self) -> Result<(), CompileError> {
        self.emit(Instr::with(Opcode::Const, 0))?;
        self.emit(Instr::new(Opcode::Equals))
    }

    fn emit_jump(&mut self, target: Operand) -> Result<(), CompileError> {
        self.emit(Instr {
            a: Some(target),
            ..Instr::new(Opcode::Const)
        })?;
        self.emit(Instr::with(Opcode::Pop, PC))
    }

    /// Pops the condition; jumps to `target` when it is zero.
    fn emit_jump_if_zero(&mut self, target: Label) -> Result<(), CompileError> {
        self.emit(Instr::address_of(target))?;
        self.emit(Instr::with(Opcode::Pop, IO))?;
        self.emit(Instr::with(Opcode::JumpIf, IO))
    }

    fn emit_epilogue(&mut self) -> Result<(), CompileError> {
        if self.depth != 0 {
            return Err(CompileError::stack_mismatch(self.name(), self.depth));
        }

        if self.function.is_entry() {
            return self.emit_jump(Operand::Imm(HALT));
        }

        // Frame words sit below this function's zero, so these bypass the
        // underflow check in `emit`.
        self.out.push(Instr::with(Opcode::Pop, BOS));
        self.out.push(Instr::with(Opcode::Pop, PC));
        self.depth -= FRAME_WORDS;
        Ok(())
    }

    /// Appends one instruction, fusing `PUSH a; POP b` into `COPY b a`.
    ///
    /// The depth counter follows the unfused stream either way.
    fn emit(&mut self, instr: Instr) -> Result<(), CompileError> {
        self.depth += instr.op.stack_effect();
        if self.depth < 0 {
            return Err(CompileError::internal(format!(
                "stack underflow in {} at {}",
                self.name(),
                instr
            )));
        }

        if self.options.fuse_register_moves && instr.op == Opcode::Pop {
            if let Some(prev) = self.out.last().filter(|p| p.op == Opcode::Push) {
                if let (Some(to), Some(from)) = (instr.imm_a(), prev.imm_a()) {
                    self.out.pop();
                    if to != from {
                        self.out.push(Instr::with2(Opcode::Copy, to, from));
                    }
                    return Ok(());
                }
            }
        }

        self.out.push(instr);
        Ok(())
    }

    fn register_of(&self, name: &str) -> Result<i32, CompileError> {
        self.function
            .variable_index(name)
            .map(var_register)
            .ok_or_else(|| CompileError::undeclared_variable(self.name(), name))
    }

    fn unvalidated(&self, construct: impl std::fmt::Display) -> CompileError {
        CompileError::internal(format!(
            "unvalidated construct reached code generation in {}: {}",
            self.name(),
            construct
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::link::Callee;
    use crate::bytecode::validate::check_function;
    use crate::lang::{FunctionDecl, Program};

    fn int(n: i64) -> Expr {
        Expr::int(n)
    }

    fn var(name: &str) -> Expr {
        Expr::var(name)
    }

    fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(op, lhs, rhs)
    }

    /// Compiles every function of `program`; returns the named one's code.
    fn compile_with(
        program: &Program,
        name: &str,
        options: &CompileOptions,
    ) -> Result<Vec<Instr>, CompileError> {
        let mut labels = LabelAllocator::new();
        let checked: Vec<_> = program
            .functions
            .iter()
            .map(check_function)
            .collect::<Result<_, _>>()?;
        let table = FunctionTable::build(&checked, &mut labels);

        let function = checked
            .iter()
            .find(|f| f.name() == name)
            .expect("function under test");
        FunctionCompiler::new(function, &table, &mut labels, options)?.compile()
    }

    fn compile_fn(program: &Program, name: &str) -> Vec<Instr> {
        compile_with(program, name, &CompileOptions::default()).unwrap()
    }

    fn compile_main(body: Vec<Stmt>) -> Vec<Instr> {
        let program = Program::new(vec![FunctionDecl::procedure("main", &[], body)]);
        compile_fn(&program, "main")
    }

    /// Non-marker instructions rendered as text, for shape assertions.
    fn text(code: &[Instr]) -> Vec<String> {
        code.iter()
            .filter(|i| !i.is_marker())
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn test_output_statement() {
        let code = compile_main(vec![Stmt::call("output", vec![int(1), int(2), int(3)])]);
        assert_eq!(
            text(&code),
            vec!["CONST 1", "CONST 2", "CONST 3", "POP 2", "OUTPUT", "CONST -1", "POP 0"]
        );
        assert!(code.first().unwrap().is_marker());
    }

    #[test]
    fn test_input_expression() {
        let code = compile_main(vec![Stmt::local(
            "v",
            Expr::call("input", vec![int(4), int(5)]),
        )]);
        // PUSH 2; POP 3 fuses into a copy
        assert_eq!(
            text(&code),
            vec!["CONST 4", "CONST 5", "INPUT", "COPY 3 2", "CONST -1", "POP 0"]
        );
    }

    #[test]
    fn test_fusion_copy_and_drop() {
        let code = compile_main(vec![
            Stmt::local("a", int(1)),
            Stmt::local("b", var("a")),
            Stmt::assign("a", var("a")),
        ]);
        assert_eq!(
            text(&code),
            vec!["CONST 1", "POP 3", "COPY 4 3", "CONST -1", "POP 0"]
        );
    }

    #[test]
    fn test_fusion_disabled() {
        let program = Program::new(vec![FunctionDecl::procedure(
            "main",
            &[],
            vec![Stmt::local("a", int(1)), Stmt::local("b", var("a"))],
        )]);
        let options = CompileOptions {
            fuse_register_moves: false,
        };
        let code = compile_with(&program, "main", &options).unwrap();
        assert_eq!(
            text(&code),
            vec!["CONST 1", "POP 3", "PUSH 3", "POP 4", "CONST -1", "POP 0"]
        );
    }

    #[test]
    fn test_negative_literal_is_masked() {
        let code = compile_main(vec![Stmt::local("a", int(-2))]);
        assert_eq!(text(&code)[0], "CONST 65534");
    }

    #[test]
    fn test_relational_compositions() {
        let cases = [
            (BinaryOp::Lt, vec!["LESSTHAN"]),
            (BinaryOp::Le, vec!["CONST 1", "ADD", "LESSTHAN"]),
            (BinaryOp::Gt, vec!["CONST 1", "ADD", "LESSTHAN", "CONST 0", "EQUALS"]),
            (BinaryOp::Ge, vec!["LESSTHAN", "CONST 0", "EQUALS"]),
            (BinaryOp::Eq, vec!["EQUALS"]),
            (BinaryOp::Ne, vec!["EQUALS", "CONST 0", "EQUALS"]),
            (BinaryOp::Sub, vec!["CONST 65535", "MULT", "ADD"]),
            (BinaryOp::Shr, vec!["RSHIFT"]),
            (BinaryOp::Shl, vec!["LSHIFT"]),
            (BinaryOp::BitXor, vec!["XOR"]),
        ];

        for (op, expected) in cases {
            let code = compile_main(vec![
                Stmt::local("a", int(7)),
                Stmt::local("b", int(9)),
                Stmt::local("c", bin(op, var("a"), var("b"))),
            ]);
            let text = text(&code);
            // CONST 7, POP 3, CONST 9, POP 4, PUSH 3, PUSH 4, <op...>, POP 5
            let body: Vec<_> = text[6..text.len() - 3].iter().map(String::as_str).collect();
            assert_eq!(body, expected, "{}", op);
        }
    }

    #[test]
    fn test_unary_operators() {
        let code = compile_main(vec![
            Stmt::local("a", int(1)),
            Stmt::local("b", Expr::unary(UnaryOp::Neg, var("a"))),
            Stmt::local("c", Expr::unary(UnaryOp::Not, var("a"))),
            Stmt::local("d", Expr::unary(UnaryOp::Complement, var("a"))),
        ]);
        let text = text(&code);
        assert_eq!(&text[2..5], ["PUSH 3", "CONST 65535", "MULT"]);
        assert_eq!(&text[6..9], ["PUSH 3", "CONST 0", "EQUALS"]);
        assert_eq!(&text[10..12], ["PUSH 3", "NOT"]);
    }

    #[test]
    fn test_if_else_layout() {
        let code = compile_main(vec![
            Stmt::local("a", int(0)),
            Stmt::if_else(
                var("a"),
                vec![Stmt::assign("a", int(1))],
                vec![Stmt::assign("a", int(2))],
            ),
        ]);

        let shown: Vec<String> = code.iter().map(|i| i.to_string()).collect();
        // entry, a = 0, cond, jump-if-zero else, then, jump end, else:, else, end:
        let else_label = match code[4].a {
            Some(Operand::Label(l)) => l,
            ref other => panic!("expected label operand, got {:?}", other),
        };
        assert_eq!(shown[3], "PUSH 3");
        assert_eq!(shown[5], "POP 2");
        assert_eq!(shown[6], "JUMPIF 2");
        assert_eq!(shown[7], "CONST 1");
        assert_eq!(shown[8], "POP 3");
        assert_eq!(shown[10], "POP 0");
        assert_eq!(code[11], Instr::marker(else_label));
        assert_eq!(shown[12], "CONST 2");
        assert!(code[14].is_marker());
    }

    #[test]
    fn test_while_jumps_back_to_start() {
        let code = compile_main(vec![
            Stmt::local("a", int(3)),
            Stmt::while_loop(var("a"), vec![Stmt::assign("a", int(0))]),
        ]);

        let start = code[3].mark.expect("loop start marker");
        let back_jump = code
            .iter()
            .position(|i| i.a == Some(Operand::Label(start)))
            .expect("jump back");
        assert_eq!(code[back_jump + 1].to_string(), "POP 0");
        assert!(code[back_jump + 2].is_marker());
    }

    #[test]
    fn test_and_short_circuit_layout() {
        let code = compile_main(vec![
            Stmt::local("a", int(1)),
            Stmt::local("b", int(0)),
            Stmt::local("c", bin(BinaryOp::And, var("a"), var("b"))),
        ]);
        let text = text(&code);
        assert_eq!(
            &text[4..],
            [
                "PUSH 3", "CONST L2", "POP 2", "JUMPIF 2", "PUSH 4", "CONST L3", "POP 0",
                "CONST 0", "POP 5", "CONST -1", "POP 0"
            ]
        );
    }

    #[test]
    fn test_or_short_circuit_layout() {
        let code = compile_main(vec![
            Stmt::local("a", int(1)),
            Stmt::local("b", int(0)),
            Stmt::local("c", bin(BinaryOp::Or, var("a"), var("b"))),
        ]);
        let text = text(&code);
        assert_eq!(
            &text[4..],
            [
                "PUSH 3", "CONST L2", "POP 2", "JUMPIF 2", "CONST 1", "CONST L3", "POP 0",
                "PUSH 4", "POP 5", "CONST -1", "POP 0"
            ]
        );
    }

    #[test]
    fn test_nested_short_circuit_balances_depth() {
        let cond = bin(
            BinaryOp::Or,
            bin(BinaryOp::And, var("a"), var("b")),
            bin(BinaryOp::And, var("b"), Expr::paren(bin(BinaryOp::Or, var("a"), int(0)))),
        );
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![]),
            FunctionDecl::function("f", &["a", "b"], vec![Stmt::ret(cond)]),
        ]);
        // would fail with a stack mismatch if either arm were double counted
        assert!(compile_with(&program, "f", &CompileOptions::default()).is_ok());
    }

    #[test]
    fn test_prologue_pops_parameters_in_reverse() {
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![]),
            FunctionDecl::procedure("f", &["a", "b", "c"], vec![]),
        ]);
        let code = compile_fn(&program, "f");
        assert_eq!(
            text(&code),
            vec!["POP 5", "POP 4", "POP 3", "POP 1", "POP 0"]
        );
    }

    #[test]
    fn test_return_value_through_io() {
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![]),
            FunctionDecl::function("f", &["a"], vec![Stmt::ret(var("a"))]),
        ]);
        let code = compile_fn(&program, "f");
        let text = text(&code);
        assert_eq!(text[1], "COPY 2 3");
        assert_eq!(text[3], "POP 0");
        assert_eq!(&text[4..], ["POP 1", "POP 0"]);
    }

    #[test]
    fn test_call_sequence() {
        let program = Program::new(vec![
            FunctionDecl::procedure(
                "main",
                &[],
                vec![
                    Stmt::local("a", int(5)),
                    Stmt::local("b", int(6)),
                    Stmt::local("r", Expr::call("add", vec![var("a"), var("b")])),
                ],
            ),
            FunctionDecl::function(
                "add",
                &["x", "y"],
                vec![Stmt::ret(bin(BinaryOp::Add, var("x"), var("y")))],
            ),
        ]);

        let code = compile_fn(&program, "main");
        let text = text(&code);
        assert_eq!(
            &text[4..],
            [
                // save r, b, a
                "PUSH 5", "PUSH 4", "PUSH 3",
                // return address and frame base
                "CONST L3", "PUSH 1",
                // arguments
                "PUSH 3", "PUSH 4",
                // BOS += 5
                "PUSH 1", "CONST 5", "ADD", "POP 1",
                // jump to add
                "CONST L1", "POP 0",
                // restore a, b, r
                "POP 3", "POP 4", "POP 5",
                // result
                "COPY 5 2",
                "CONST -1", "POP 0",
            ]
        );
    }

    #[test]
    fn test_void_call_statement_discards_nothing() {
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![Stmt::call("f", vec![])]),
            FunctionDecl::procedure("f", &[], vec![]),
        ]);
        let code = compile_fn(&program, "main");
        assert_eq!(
            text(&code),
            vec![
                "CONST L3", "PUSH 1", "PUSH 1", "CONST 2", "ADD", "POP 1", "CONST L1", "POP 0",
                "CONST -1", "POP 0"
            ]
        );
    }

    #[test]
    fn test_value_call_as_statement_is_legal() {
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![Stmt::call("f", vec![int(1)])]),
            FunctionDecl::function("f", &["a"], vec![Stmt::ret(var("a"))]),
        ]);
        let code = compile_fn(&program, "main");
        assert!(!text(&code).iter().any(|t| t == "PUSH 2"));
    }

    #[test]
    fn test_call_errors() {
        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![Stmt::call("missing", vec![])]),
        ]);
        let err = compile_with(&program, "main", &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no such function 'missing'"));

        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![Stmt::call("f", vec![])]),
            FunctionDecl::procedure("f", &["a"], vec![]),
        ]);
        let err = compile_with(&program, "main", &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("expected 1, was 0"));

        let program = Program::new(vec![
            FunctionDecl::procedure("main", &[], vec![Stmt::local("x", Expr::call("f", vec![]))]),
            FunctionDecl::procedure("f", &[], vec![]),
        ]);
        let err = compile_with(&program, "main", &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("is void"));
    }

    #[test]
    fn test_undeclared_variable() {
        let program = Program::new(vec![FunctionDecl::procedure(
            "main",
            &[],
            vec![Stmt::assign("ghost", int(1))],
        )]);
        let err = compile_with(&program, "main", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Scope { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_variable_usable_before_its_declaration_site() {
        // one flat namespace per function
        let program = Program::new(vec![FunctionDecl::procedure(
            "main",
            &[],
            vec![Stmt::assign("x", int(1)), Stmt::local("x", int(2))],
        )]);
        assert!(compile_with(&program, "main", &CompileOptions::default()).is_ok());
    }
}
