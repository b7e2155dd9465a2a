use std::collections::{HashMap, HashSet};

use crate::{
    bytecode::{
        compile::FunctionCompiler,
        compile_error::CompileError,
        ir::{Bytecode, Instr, Instruction, Label, LabelAllocator, Operand, Symbol},
        validate::{CheckedFunction, INPUT, OUTPUT, check_function},
    },
    lang::Program,
};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Replace adjacent `PUSH a; POP b` with `COPY b a`.
    pub fuse_register_moves: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            fuse_register_moves: true,
        }
    }
}

/// What a call site needs to know about its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callee {
    pub params: usize,
    pub returns_value: bool,
    pub entry: Label,
}

/// Every function of the program, by name. Built once before any code is
/// generated and read-only afterwards.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Callee>,
}

impl FunctionTable {
    pub fn build(functions: &[CheckedFunction<'_>], labels: &mut LabelAllocator) -> Self {
        let functions = functions
            .iter()
            .map(|f| {
                let callee = Callee {
                    params: f.signature.params,
                    returns_value: f.signature.returns_value,
                    entry: labels.fresh(),
                };
                (f.signature.name.clone(), callee)
            })
            .collect();
        FunctionTable { functions }
    }

    pub fn get(&self, name: &str) -> Option<&Callee> {
        self.functions.get(name)
    }
}

/// One function's code, ready for layout.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub entry: Label,
    pub code: Vec<Instr>,
}

pub struct Linker {
    options: CompileOptions,
}

impl Linker {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compiles and links a whole program. `main` is laid out first, then
    /// the remaining functions in declaration order.
    pub fn link(&self, program: &Program) -> Result<Bytecode, CompileError> {
        let units = self.compile_units(program)?;
        resolve(&units)
    }

    /// Discovery, validation and code generation, without position
    /// resolution.
    pub fn compile_units(&self, program: &Program) -> Result<Vec<Unit>, CompileError> {
        // Pass 1: discover and validate every declaration.
        let mut seen = HashSet::new();
        let mut checked = Vec::with_capacity(program.functions.len());
        for decl in &program.functions {
            if decl.name == INPUT || decl.name == OUTPUT {
                return Err(CompileError::reserved_name(&decl.name));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(CompileError::duplicate_function(&decl.name));
            }
            checked.push(check_function(decl)?);
        }

        let main = checked
            .iter()
            .position(CheckedFunction::is_entry)
            .ok_or_else(CompileError::missing_main)?;
        let signature = &checked[main].signature;
        if signature.returns_value || signature.params > 0 {
            return Err(CompileError::bad_main(checked[main].decl));
        }

        let mut labels = LabelAllocator::new();
        let table = FunctionTable::build(&checked, &mut labels);

        // Pass 2: generate code, main first.
        let order = std::iter::once(main).chain((0..checked.len()).filter(|&i| i != main));
        let mut units = Vec::with_capacity(checked.len());
        for i in order {
            let function = &checked[i];
            let code =
                FunctionCompiler::new(function, &table, &mut labels, &self.options)?.compile()?;
            let entry = table
                .get(function.name())
                .map(|callee| callee.entry)
                .ok_or_else(|| CompileError::internal("function table out of sync"))?;
            units.push(Unit {
                name: function.name().to_string(),
                entry,
                code,
            });
        }

        Ok(units)
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenates `units` and resolves every label operand.
///
/// A single left-to-right walk gives each instruction the number of
/// instructions kept before it. Markers record that number for their label
/// and are then dropped without advancing it, so a label resolves to the
/// next real instruction after its marker. Operands are only substituted
/// once the walk is complete.
pub fn resolve(units: &[Unit]) -> Result<Bytecode, CompileError> {
    let mut positions: HashMap<Label, u32> = HashMap::new();
    let mut kept: Vec<&Instr> = Vec::new();

    for instr in units.iter().flat_map(|u| u.code.iter()) {
        let pos = kept.len() as u32;
        if let Some(label) = instr.mark {
            if positions.insert(label, pos).is_some() {
                return Err(CompileError::internal(format!("label {} placed twice", label)));
            }
        }
        if !instr.is_marker() {
            kept.push(instr);
        }
    }

    let lookup = |operand: Option<Operand>| -> Result<Option<i32>, CompileError> {
        match operand {
            None => Ok(None),
            Some(Operand::Imm(n)) => Ok(Some(n)),
            Some(Operand::Label(label)) => positions
                .get(&label)
                .map(|&pos| Some(pos as i32))
                .ok_or_else(|| CompileError::internal(format!("unresolved label {}", label))),
        }
    };

    let code = kept
        .iter()
        .map(|instr| {
            Ok(Instruction {
                opcode: instr.op,
                a: lookup(instr.a)?,
                b: lookup(instr.b)?,
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let symbols = units
        .iter()
        .map(|u| {
            let entry = positions.get(&u.entry).copied().ok_or_else(|| {
                CompileError::internal(format!("function {} has no entry marker", u.name))
            })?;
            Ok(Symbol {
                name: u.name.clone(),
                entry,
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    Ok(Bytecode { code, symbols })
}
