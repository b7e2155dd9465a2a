use std::{env, fs};

use gridc::bytecode::disasm::print_listing;
use gridc::bytecode::{Bytecode, CompileOptions, Linker};
use gridc::lang::{Program, samples};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let listing = args.contains(&"--listing".to_string());
    let verbose = args.contains(&"--verbose".to_string());
    let options = CompileOptions {
        fuse_register_moves: !args.contains(&"--no-fuse".to_string()),
    };
    let image = flag_value(&args, "--image");
    let demo = flag_value(&args, "--demo");

    let program = match demo {
        Some(name) => match samples::by_name(&name) {
            Some(program) => program,
            None => {
                eprintln!(
                    "Unknown demo '{}', expected one of: {}",
                    name,
                    samples::NAMES.join(", ")
                );
                std::process::exit(1);
            }
        },
        None => match input_file(&args) {
            Some(filename) => load_program(filename),
            None => {
                print_usage();
                std::process::exit(1);
            }
        },
    };

    if verbose {
        eprintln!("compiling {} function(s)", program.functions.len());
        for function in &program.functions {
            eprintln!("  {}", function);
        }
    }

    let bytecode = match Linker::with_options(options).link(&program) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if verbose {
        eprintln!("linked {} instruction(s)", bytecode.len());
        for (i, symbol) in bytecode.symbols.iter().enumerate() {
            let end = bytecode
                .symbols
                .get(i + 1)
                .map_or(bytecode.len(), |next| next.entry as usize);
            eprintln!(
                "  {} @ {} ({} instructions)",
                symbol.name,
                symbol.entry,
                end - symbol.entry as usize
            );
        }
    }

    if let Some(path) = image {
        write_image(&bytecode, &path);
    }

    if listing {
        print_listing(&bytecode);
    } else {
        print!("{}", bytecode);
    }
}

/// Value following `flag`, e.g. `--image out.bin`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    match args.get(pos + 1) {
        Some(value) if !value.starts_with('-') => Some(value.clone()),
        _ => {
            eprintln!("Error: {} expects a value", flag);
            std::process::exit(1);
        }
    }
}

// first argument that is neither a flag nor a flag's value
fn input_file(args: &[String]) -> Option<&String> {
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if arg == "--image" || arg == "--demo" {
            rest.next();
        } else if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

fn load_program(filename: &str) -> Program {
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            std::process::exit(1);
        }
    };
    match Program::from_bytes(&bytes) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Failed to decode '{}': {}", filename, e);
            std::process::exit(1);
        }
    }
}

fn write_image(bytecode: &Bytecode, path: &str) {
    let bytes = match bytecode.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to encode image: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = fs::write(path, bytes) {
        eprintln!("Failed to write '{}': {}", path, e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("GRIDC - compiler for the grid stack machine");
    println!();
    println!("Usage:");
    println!("  gridc <program.bin>           Compile a postcard-encoded syntax tree");
    println!("  gridc --demo <name>           Compile a bundled sample ({})", samples::NAMES.join(", "));
    println!("  gridc --listing ...           Print an annotated listing");
    println!("  gridc --image <out> ...       Also write the linked image");
    println!("  gridc --no-fuse ...           Keep PUSH/POP register moves unfused");
    println!("  gridc --verbose ...           Report functions and symbols on stderr");
    println!("  gridc --help, -h              Show this help");
}
