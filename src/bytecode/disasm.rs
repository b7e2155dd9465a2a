use crate::bytecode::ir::{Bytecode, Instruction};
use crate::bytecode::op::{BOS, IO, Opcode, PC};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Print an annotated listing of a linked program
pub fn print_listing(bc: &Bytecode) {
    print!("{}", format_listing(bc));
}

/// Annotated listing: one numbered line per instruction, a banner at each
/// function entry and a `►` on every jump target.
pub fn format_listing(bc: &Bytecode) -> String {
    let targets = collect_jump_targets(&bc.code);
    let mut out = String::new();

    for (ip, instruction) in bc.code.iter().enumerate() {
        for symbol in bc.symbols.iter().filter(|s| s.entry as usize == ip) {
            let _ = writeln!(out, "════════════════════════════════════════");
            let _ = writeln!(out, " {}", symbol.name);
            let _ = writeln!(out, "════════════════════════════════════════");
        }

        let marker = if targets.contains(&ip) { "► " } else { "  " };
        let line = format!("{:04} {}{}", ip, marker, instruction);
        match comment(&bc.code, ip) {
            Some(c) => {
                let _ = writeln!(out, "{:<28}; {}", line, c);
            }
            None => {
                let _ = writeln!(out, "{}", line);
            }
        }
    }

    out
}

/// Positions reached by a jump, a conditional jump or a return.
///
/// Targets are recognised from the emitted idioms: `CONST t; POP PC`,
/// `CONST t; POP IO; JUMPIF IO` and the return address `CONST t; PUSH BOS`.
fn collect_jump_targets(code: &[Instruction]) -> BTreeSet<usize> {
    let mut targets = BTreeSet::new();

    for (ip, instruction) in code.iter().enumerate() {
        if is_target_load(code, ip) {
            if let Some(t) = instruction.a.filter(|t| *t >= 0) {
                targets.insert(t as usize);
            }
        }
    }

    targets
}

fn is_target_load(code: &[Instruction], ip: usize) -> bool {
    if code[ip].opcode != Opcode::Const {
        return false;
    }
    let is = |offset: usize, opcode: Opcode, reg: i32| {
        code.get(ip + offset)
            .is_some_and(|i| i.opcode == opcode && i.a == Some(reg))
    };
    is(1, Opcode::Pop, PC)
        || (is(1, Opcode::Pop, IO) && is(2, Opcode::JumpIf, IO))
        || (is(1, Opcode::Push, BOS) && !is_frame_switch(code, ip + 2))
}

// `CONST off; ADD; POP BOS` moves BOS to the callee's frame. A literal last
// argument sits right before the `PUSH BOS` that starts it.
fn is_frame_switch(code: &[Instruction], ip: usize) -> bool {
    let op = |offset: usize| code.get(ip + offset).map(|i| (i.opcode, i.a));
    matches!(op(0), Some((Opcode::Const, _)))
        && op(1) == Some((Opcode::Add, None))
        && op(2) == Some((Opcode::Pop, Some(BOS)))
}

fn comment(code: &[Instruction], ip: usize) -> Option<String> {
    let instruction = &code[ip];
    match (instruction.opcode, instruction.a) {
        (Opcode::Pop, Some(PC)) => match ip.checked_sub(1).map(|p| &code[p]) {
            Some(prev) if prev.opcode == Opcode::Const && prev.a == Some(-1) => {
                Some("halt".to_string())
            }
            Some(prev) if prev.opcode == Opcode::Const => {
                Some(format!("jump {}", prev.a.unwrap_or_default()))
            }
            _ => Some("return".to_string()),
        },
        (Opcode::JumpIf, _) => Some("jump if zero".to_string()),
        (Opcode::Copy, Some(dst)) => Some(format!("r{} := r{}", dst, instruction.b.unwrap_or_default())),
        _ => None,
    }
}
