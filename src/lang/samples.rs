//! Bundled sample programs, built directly as syntax trees.

use super::node::{BinaryOp, Expr, Stmt};
use super::program::{FunctionDecl, Program};

fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

fn int(n: i64) -> Expr {
    Expr::int(n)
}

fn var(name: &str) -> Expr {
    Expr::var(name)
}

/// ```text
/// void main() { output(1, 2, 3); }
/// ```
pub fn output_once() -> Program {
    Program::new(vec![FunctionDecl::procedure(
        "main",
        &[],
        vec![Stmt::call("output", vec![int(1), int(2), int(3)])],
    )])
}

/// ```text
/// void main() {
///     int n = 1;
///     while(n < 11) { collatz(n); n = n + 1; }
/// }
///
/// void collatz(int n) {
///     int i = 0;
///     int x = n;
///     output(i, n, x);
///     while(x >= 2) {
///         if(x & 1) { x = 3*x + 1; } else { x = x >> 1; }
///         i = i + 1;
///         output(i, n, x);
///     }
/// }
/// ```
pub fn collatz() -> Program {
    let main = FunctionDecl::procedure(
        "main",
        &[],
        vec![
            Stmt::local("n", int(1)),
            Stmt::while_loop(
                bin(BinaryOp::Lt, var("n"), int(11)),
                vec![
                    Stmt::call("collatz", vec![var("n")]),
                    Stmt::assign("n", bin(BinaryOp::Add, var("n"), int(1))),
                ],
            ),
        ],
    );

    let output_state = Stmt::call("output", vec![var("i"), var("n"), var("x")]);

    let collatz = FunctionDecl::procedure(
        "collatz",
        &["n"],
        vec![
            Stmt::local("i", int(0)),
            Stmt::local("x", var("n")),
            output_state.clone(),
            Stmt::while_loop(
                bin(BinaryOp::Ge, var("x"), int(2)),
                vec![
                    Stmt::if_else(
                        bin(BinaryOp::BitAnd, var("x"), int(1)),
                        vec![Stmt::assign(
                            "x",
                            bin(
                                BinaryOp::Add,
                                bin(BinaryOp::Mul, int(3), var("x")),
                                int(1),
                            ),
                        )],
                        vec![Stmt::assign("x", bin(BinaryOp::Shr, var("x"), int(1)))],
                    ),
                    Stmt::assign("i", bin(BinaryOp::Add, var("i"), int(1))),
                    output_state,
                ],
            ),
        ],
    );

    Program::new(vec![main, collatz])
}

/// Draws the cells of a 16x16 grid that fall inside a ring.
///
/// ```text
/// void main() {
///     int y = 0;
///     while(y < 16) {
///         int x = 0;
///         while(x < 16) {
///             if(inCircle(x, y)) { output(x, y, 1); }
///             x = x + 1;
///         }
///         y = y + 1;
///     }
/// }
///
/// int inCircle(int x, int y) {
///     int r = 15*(x+y) - x*x - y*y;
///     return r >= 45 && r < 96;
/// }
/// ```
pub fn circle() -> Program {
    let main = FunctionDecl::procedure(
        "main",
        &[],
        vec![
            Stmt::local("y", int(0)),
            Stmt::while_loop(
                bin(BinaryOp::Lt, var("y"), int(16)),
                vec![
                    Stmt::local("x", int(0)),
                    Stmt::while_loop(
                        bin(BinaryOp::Lt, var("x"), int(16)),
                        vec![
                            Stmt::if_then(
                                Expr::call("inCircle", vec![var("x"), var("y")]),
                                vec![Stmt::call("output", vec![var("x"), var("y"), int(1)])],
                            ),
                            Stmt::assign("x", bin(BinaryOp::Add, var("x"), int(1))),
                        ],
                    ),
                    Stmt::assign("y", bin(BinaryOp::Add, var("y"), int(1))),
                ],
            ),
        ],
    );

    let r = bin(
        BinaryOp::Sub,
        bin(
            BinaryOp::Sub,
            bin(
                BinaryOp::Mul,
                int(15),
                Expr::paren(bin(BinaryOp::Add, var("x"), var("y"))),
            ),
            bin(BinaryOp::Mul, var("x"), var("x")),
        ),
        bin(BinaryOp::Mul, var("y"), var("y")),
    );

    let in_circle = FunctionDecl::function(
        "inCircle",
        &["x", "y"],
        vec![
            Stmt::local("r", r),
            Stmt::ret(bin(
                BinaryOp::And,
                bin(BinaryOp::Ge, var("r"), int(45)),
                bin(BinaryOp::Lt, var("r"), int(96)),
            )),
        ],
    );

    Program::new(vec![main, in_circle])
}

/// Looks up a bundled sample by name.
pub fn by_name(name: &str) -> Option<Program> {
    match name {
        "output" => Some(output_once()),
        "collatz" => Some(collatz()),
        "circle" => Some(circle()),
        _ => None,
    }
}

pub const NAMES: &[&str] = &["output", "collatz", "circle"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in NAMES {
            assert!(by_name(name).is_some(), "{}", name);
        }
        assert!(by_name("fibonacci").is_none());
    }

    #[test]
    fn test_collatz_shape() {
        let program = collatz();
        let names: Vec<_> = program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main", "collatz"]);
        assert_eq!(program.functions[1].params.len(), 1);
    }
}
