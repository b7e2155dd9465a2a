use serde::{Deserialize, Serialize};

/// Declared type of a variable, parameter or function result.
///
/// Only `Int` and `Void` mean anything to the compiler; any other name a
/// front end produces is kept verbatim so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Int,
    Void,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    Complement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Parsed but not supported by the machine.
    Div,
    /// Parsed but not supported by the machine.
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    /// Signed shift right, `>>`.
    Shr,
    /// Unsigned shift right, `>>>`. Parsed but not supported.
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit `&&`.
    And,
    /// Short-circuit `||`.
    Or,
}

/// `=` or a compound assignment such as `+=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Plain,
    Compound(BinaryOp),
}

/// A call `name(args)`. Receivers and type arguments are representable so
/// that they can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub receiver: Option<Box<Expr>>,
    pub type_args: Vec<TypeName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Int(i64),
    Var(String),
    Paren(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: String,
        value: Box<Expr>,
    },
    Call(Call),
}

/// One name in a local declaration, `x = 1` in `int x = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: TypeName,
    pub modifiers: Vec<String>,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expr(Expr),
    Local(VarDecl),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
}

// ─────────────────────────────── Builders ───────────────────────────────

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn paren(inner: Expr) -> Self {
        Expr::Paren(Box::new(inner))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Expr::Assign {
            op: AssignOp::Plain,
            target: target.to_string(),
            value: Box::new(value),
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call(Call {
            name: name.to_string(),
            args,
            receiver: None,
            type_args: Vec::new(),
        })
    }
}

impl Stmt {
    /// `int name = init;`
    pub fn local(name: &str, init: Expr) -> Self {
        Stmt::Local(VarDecl {
            ty: TypeName::Int,
            modifiers: Vec::new(),
            declarators: vec![Declarator {
                name: name.to_string(),
                init: Some(init),
            }],
        })
    }

    /// `name = value;`
    pub fn assign(name: &str, value: Expr) -> Self {
        Stmt::Expr(Expr::assign(name, value))
    }

    /// `name(args);`
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Stmt::Expr(Expr::call(name, args))
    }

    pub fn if_then(cond: Expr, then: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then: Box::new(Stmt::Block(then)),
            otherwise: None,
        }
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then: Box::new(Stmt::Block(then)),
            otherwise: Some(Box::new(Stmt::Block(otherwise))),
        }
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            cond,
            body: Box::new(Stmt::Block(body)),
        }
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }
}

// ──────────────────────────── Source rendering ────────────────────────────

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Int => write!(f, "int"),
            TypeName::Void => write!(f, "void"),
            TypeName::Other(name) => write!(f, "{}", name),
        }
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "~",
        })
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BinaryOp::*;
        f.write_str(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            UShr => ">>>",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            And => "&&",
            Or => "||",
        })
    }
}

impl std::fmt::Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignOp::Plain => write!(f, "="),
            AssignOp::Compound(op) => write!(f, "{}=", op),
        }
    }
}

fn write_list<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl std::fmt::Display for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(receiver) = &self.receiver {
            write!(f, "{}.", receiver)?;
        }
        if !self.type_args.is_empty() {
            write!(f, "<")?;
            write_list(f, &self.type_args)?;
            write!(f, ">")?;
        }
        write!(f, "{}(", self.name)?;
        write_list(f, &self.args)?;
        write!(f, ")")
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Paren(inner) => write!(f, "({})", inner),
            Expr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Assign { op, target, value } => write!(f, "{} {} {}", target, op, value),
            Expr::Call(call) => write!(f, "{}", call),
        }
    }
}

impl std::fmt::Display for Declarator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.init {
            Some(init) => write!(f, "{} = {}", self.name, init),
            None => write!(f, "{}", self.name),
        }
    }
}

impl std::fmt::Display for VarDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for m in &self.modifiers {
            write!(f, "{} ", m)?;
        }
        write!(f, "{} ", self.ty)?;
        write_list(f, &self.declarators)
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Block(stmts) => {
                write!(f, "{{")?;
                for s in stmts {
                    write!(f, " {}", s)?;
                }
                write!(f, " }}")
            }
            Stmt::Expr(e) => write!(f, "{};", e),
            Stmt::Local(decl) => write!(f, "{};", decl),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                write!(f, "if ({}) {}", cond, then)?;
                if let Some(otherwise) = otherwise {
                    write!(f, " else {}", otherwise)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => write!(f, "while ({}) {}", cond, body),
            Stmt::Return(Some(e)) => write!(f, "return {};", e),
            Stmt::Return(None) => write!(f, "return;"),
        }
    }
}
