use serde::{Deserialize, Serialize};

// =============================================================================
// Registers
// =============================================================================

/// Program counter. Popping into it is an unconditional jump.
pub const PC: i32 = 0;

/// Base of the current call frame on the operand stack.
pub const BOS: i32 = 1;

/// Scratch register for `input`/`output`, jump targets and return values.
pub const IO: i32 = 2;

/// First register available to named variables.
pub const FIRST_VAR: i32 = 3;

/// Variables live in registers `FIRST_VAR..FIRST_VAR + MAX_VARIABLES`.
pub const MAX_VARIABLES: usize = 5;

/// Largest value representable in a machine word (16-bit).
pub const MAX_INT: i32 = (1 << 16) - 1;

/// Jump target meaning "stop the machine".
pub const HALT: i32 = -1;

// =============================================================================
// OPCODE - machine instructions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Marker. Never survives linking.
    Noop,

    /// `CONST k` ( -- k )
    Const,

    /// `PUSH r` ( -- r )
    Push,
    /// `POP r` ( x -- ), r := x
    Pop,

    // Indexed stack access relative to BOS. Reserved, not emitted.
    Load,
    Store,

    /// `COPY dst src`, dst := src
    Copy,

    /// ( x y -- ), IO := grid[x, y]
    Input,
    /// ( x y -- ), grid[x, y] := IO
    Output,

    /// `JUMPIF r` ( c -- ), jumps to the address in r when c is zero
    JumpIf,

    Add,
    Mult,
    And,
    Or,
    Xor,
    LShift,
    RShift,

    /// Bitwise complement ( x -- ~x )
    Not,

    Equals,
    LessThan,
}

impl Opcode {
    /// Net change to the operand stack depth when this opcode executes.
    pub fn stack_effect(self) -> i32 {
        use Opcode::*;
        match self {
            Noop | Load | Store | Copy | Not => 0,
            Const | Push => 1,
            Pop | JumpIf => -1,
            Input | Output => -2,
            Add | Mult | And | Or | Xor | LShift | RShift | Equals | LessThan => -1,
        }
    }

    /// Number of operands the instruction carries.
    pub fn arity(self) -> usize {
        use Opcode::*;
        match self {
            Const | Push | Pop | JumpIf => 1,
            Load | Store | Copy => 2,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Noop => "NOOP",
            Const => "CONST",
            Push => "PUSH",
            Pop => "POP",
            Load => "LOAD",
            Store => "STORE",
            Copy => "COPY",
            Input => "INPUT",
            Output => "OUTPUT",
            JumpIf => "JUMPIF",
            Add => "ADD",
            Mult => "MULT",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            LShift => "LSHIFT",
            RShift => "RSHIFT",
            Not => "NOT",
            Equals => "EQUALS",
            LessThan => "LESSTHAN",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Register holding the `index`th declared variable of a function.
pub fn var_register(index: usize) -> i32 {
    FIRST_VAR + index as i32
}
