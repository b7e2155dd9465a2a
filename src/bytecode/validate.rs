//! Acceptance pass.
//!
//! Walks one function declaration and rejects every shape the code
//! generator does not translate. What comes out is the function's
//! [`Signature`] and its flat variable table; code generation only ever sees
//! functions that went through here.
//!
//! Checks that need the program-wide function table (unknown callee,
//! argument count, void callee in value position) are left to code
//! generation.

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::{MAX_INT, MAX_VARIABLES};
use crate::lang::{AssignOp, BinaryOp, Call, Expr, FunctionDecl, Stmt, TypeName};

/// Name the front end may use for a debugging builtin; not a user function.
pub const PRINT: &str = "print";
pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";

/// What callers need to know about a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: usize,
    pub returns_value: bool,
}

/// A declaration that passed validation.
#[derive(Debug, Clone)]
pub struct CheckedFunction<'a> {
    pub decl: &'a FunctionDecl,
    pub signature: Signature,
    /// Parameters first, then locals in declaration order. A variable's
    /// index here decides its register.
    pub variables: Vec<String>,
}

impl CheckedFunction<'_> {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn is_entry(&self) -> bool {
        self.signature.name == "main"
    }
}

/// The 16-bit word a literal compiles to, or `None` when it does not fit.
pub fn literal_word(value: i64) -> Option<i32> {
    if value < -(MAX_INT as i64) || value > MAX_INT as i64 {
        None
    } else {
        Some((value as i32) & MAX_INT)
    }
}

pub fn check_function(decl: &FunctionDecl) -> Result<CheckedFunction<'_>, CompileError> {
    if !decl.modifiers.is_empty() || !decl.type_params.is_empty() || !decl.throws.is_empty() {
        return Err(CompileError::disallowed_decoration(decl));
    }
    if decl.name == PRINT {
        return Err(CompileError::reserved_name(&decl.name));
    }

    let returns_value = match decl.return_type {
        TypeName::Int => true,
        TypeName::Void => false,
        TypeName::Other(_) => return Err(CompileError::invalid_return_type(decl)),
    };

    let mut checker = Checker {
        function: &decl.name,
        returns_value,
        variables: Vec::new(),
    };

    for param in &decl.params {
        if param.ty != TypeName::Int {
            return Err(CompileError::not_int(
                &decl.name,
                format!("{} {}", param.ty, param.name),
                &param.ty,
            ));
        }
        checker.declare(&param.name)?;
    }

    for stmt in &decl.body {
        checker.stmt(stmt)?;
    }

    Ok(CheckedFunction {
        decl,
        signature: Signature {
            name: decl.name.clone(),
            params: decl.params.len(),
            returns_value,
        },
        variables: checker.variables,
    })
}

struct Checker<'a> {
    function: &'a str,
    returns_value: bool,
    variables: Vec<String>,
}

impl Checker<'_> {
    // TODO: spill past MAX_VARIABLES into the frame with LOAD/STORE
    fn declare(&mut self, name: &str) -> Result<(), CompileError> {
        if self.variables.iter().any(|v| v == name) {
            return Err(CompileError::redeclared(self.function, name));
        }
        self.variables.push(name.to_string());
        if self.variables.len() > MAX_VARIABLES {
            return Err(CompileError::too_many_variables(self.function, name));
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(s)?;
                }
                Ok(())
            }

            Stmt::Local(decl) => {
                if decl.ty != TypeName::Int {
                    return Err(CompileError::not_int(self.function, stmt, &decl.ty));
                }
                if decl.declarators.len() != 1 {
                    return Err(CompileError::shape(
                        self.function,
                        stmt,
                        "cannot declare multiple variables at once",
                    ));
                }
                if !decl.modifiers.is_empty() {
                    return Err(CompileError::shape(
                        self.function,
                        stmt,
                        "variable declaration cannot have modifiers",
                    ));
                }
                let declarator = &decl.declarators[0];
                let Some(init) = &declarator.init else {
                    return Err(CompileError::shape(
                        self.function,
                        stmt,
                        "variable declaration must have initialiser",
                    ));
                };
                self.declare(&declarator.name)?;
                self.value(init)
            }

            Stmt::Expr(expr) => self.effect(stmt, expr),

            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.value(cond)?;
                self.stmt(then)?;
                if let Some(otherwise) = otherwise {
                    self.stmt(otherwise)?;
                }
                Ok(())
            }

            Stmt::While { cond, body } => {
                self.value(cond)?;
                self.stmt(body)
            }

            Stmt::Return(value) => match (value, self.returns_value) {
                (Some(e), true) => self.value(e),
                (None, false) => Ok(()),
                (Some(_), false) => Err(CompileError::shape(
                    self.function,
                    stmt,
                    "cannot return value from void function",
                )),
                (None, true) => Err(CompileError::shape(
                    self.function,
                    stmt,
                    "non-void function must return a value",
                )),
            },
        }
    }

    /// An expression used as a statement: an assignment or a call.
    fn effect(&mut self, stmt: &Stmt, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Assign { op, value, .. } => {
                self.assign_op(expr, *op)?;
                self.value(value)
            }
            Expr::Call(call) => {
                self.call_shape(call)?;
                if call.name == INPUT {
                    return Err(CompileError::shape(
                        self.function,
                        stmt,
                        "input(...) call cannot be statement",
                    ));
                }
                if call.name == OUTPUT {
                    self.builtin_arity(call, 3, "output(x,y,v) must take three arguments")?;
                }
                self.args(call)
            }
            _ => Err(CompileError::shape(
                self.function,
                stmt,
                "expression statement must be an assignment or a call",
            )),
        }
    }

    /// An expression whose value is used.
    fn value(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Int(n) => match literal_word(*n) {
                Some(_) => Ok(()),
                None => Err(CompileError::literal_out_of_range(self.function, *n)),
            },
            Expr::Var(_) => Ok(()),
            Expr::Paren(inner) => self.value(inner),
            Expr::Unary { operand, .. } => self.value(operand),
            Expr::Binary { op, lhs, rhs } => {
                if matches!(op, BinaryOp::Div | BinaryOp::Rem | BinaryOp::UShr) {
                    return Err(CompileError::shape(
                        self.function,
                        expr,
                        format!("invalid binary operator {}", op),
                    ));
                }
                self.value(lhs)?;
                self.value(rhs)
            }
            Expr::Assign { op, .. } => {
                self.assign_op(expr, *op)?;
                Err(CompileError::shape(
                    self.function,
                    expr,
                    "assignment cannot be used as a value",
                ))
            }
            Expr::Call(call) => {
                self.call_shape(call)?;
                if call.name == OUTPUT {
                    return Err(CompileError::shape(
                        self.function,
                        expr,
                        "output(...) call cannot be expression",
                    ));
                }
                if call.name == INPUT {
                    self.builtin_arity(call, 2, "input(x,y) must take two arguments")?;
                }
                self.args(call)
            }
        }
    }

    fn args(&mut self, call: &Call) -> Result<(), CompileError> {
        for arg in &call.args {
            self.value(arg)?;
        }
        Ok(())
    }

    fn assign_op(&self, expr: &Expr, op: AssignOp) -> Result<(), CompileError> {
        match op {
            AssignOp::Plain => Ok(()),
            AssignOp::Compound(_) => Err(CompileError::shape(
                self.function,
                expr,
                format!("illegal assignment operator {}", op),
            )
            .with_hint("only plain `=` assignment is supported")),
        }
    }

    fn call_shape(&self, call: &Call) -> Result<(), CompileError> {
        if call.receiver.is_some() {
            return Err(CompileError::shape(
                self.function,
                call,
                "method call cannot have scope",
            ));
        }
        if !call.type_args.is_empty() {
            return Err(CompileError::shape(
                self.function,
                call,
                "method call cannot have type arguments",
            ));
        }
        Ok(())
    }

    fn builtin_arity(&self, call: &Call, expected: usize, msg: &str) -> Result<(), CompileError> {
        if call.args.len() != expected {
            return Err(CompileError::signature(
                Some(self.function),
                call.to_string(),
                msg,
            ));
        }
        Ok(())
    }
}
