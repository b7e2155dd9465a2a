use crate::bytecode::op::Opcode;
use serde::{Deserialize, Serialize};

// =============================================================================
// Emission-time form: operands may point at markers not yet positioned
// =============================================================================

/// Identity of a marker instruction. Unique across the whole program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Hands out fresh labels. One allocator is shared by every function of a
/// program so that labels never collide after concatenation.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(i32),
    /// Final position of the marker carrying this label.
    Label(Label),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Imm(n) => write!(f, "{}", n),
            Operand::Label(l) => write!(f, "{}", l),
        }
    }
}

/// An emitted, not yet positioned instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub op: Opcode,
    pub a: Option<Operand>,
    pub b: Option<Operand>,
    /// Set on markers: the label jumps use to reach this point.
    pub mark: Option<Label>,
}

impl Instr {
    pub fn new(op: Opcode) -> Self {
        Self {
            op,
            a: None,
            b: None,
            mark: None,
        }
    }

    pub fn with(op: Opcode, a: i32) -> Self {
        Self {
            a: Some(Operand::Imm(a)),
            ..Self::new(op)
        }
    }

    pub fn with2(op: Opcode, a: i32, b: i32) -> Self {
        Self {
            a: Some(Operand::Imm(a)),
            b: Some(Operand::Imm(b)),
            ..Self::new(op)
        }
    }

    /// `CONST <position of label>`
    pub fn address_of(label: Label) -> Self {
        Self {
            a: Some(Operand::Label(label)),
            ..Self::new(Opcode::Const)
        }
    }

    pub fn marker(label: Label) -> Self {
        Self {
            mark: Some(label),
            ..Self::new(Opcode::Noop)
        }
    }

    pub fn is_marker(&self) -> bool {
        self.op == Opcode::Noop
    }

    /// Immediate first operand, if the instruction has one.
    pub fn imm_a(&self) -> Option<i32> {
        match self.a {
            Some(Operand::Imm(n)) => Some(n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(label) = self.mark {
            return write!(f, "{}:", label);
        }
        write!(f, "{}", self.op)?;
        if let Some(a) = self.a {
            write!(f, " {}", a)?;
        }
        if let Some(b) = self.b {
            write!(f, " {}", b)?;
        }
        Ok(())
    }
}

// =============================================================================
// Linked form
// =============================================================================

/// A positioned instruction with every operand resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub a: Option<i32>,
    pub b: Option<i32>,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        if let Some(a) = self.a {
            write!(f, " {}", a)?;
            if let Some(b) = self.b {
                write!(f, " {}", b)?;
            }
        }
        Ok(())
    }
}

/// Resolved entry position of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub entry: u32,
}

/// A linked program image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bytecode {
    /// Instruction stream. Execution starts at 0, which is `main`.
    pub code: Vec<Instruction>,

    /// Function entry points, in layout order.
    pub symbols: Vec<Symbol>,
}

impl Bytecode {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl std::fmt::Display for Bytecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instruction in &self.code {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
