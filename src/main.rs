mod bytecode;
mod frontend;
mod lang;
mod repl;
mod runtime;

use std::{env, fs, path::Path, process};

use crate::bytecode::compile::compile_default;
use crate::bytecode::container::Program;
use crate::bytecode::disasm::{DisasmOptions, disassemble};
use crate::frontend::lexer::Lexer;
use crate::frontend::token_dumper::TokenDumper;
use crate::runtime::host::HostApi;
use crate::runtime::vm::Vm;

fn main() {
    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let no_color = args.contains(&"--no-color".to_string());
    let pretty = args.contains(&"--pretty".to_string());
    let dis = args.contains(&"--dis".to_string());
    let cfg = args.contains(&"--cfg".to_string());
    let build = args.contains(&"--build".to_string());
    let trace = args.contains(&"--trace".to_string());

    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        print_usage();
        return;
    }

    // first non-flag argument is the filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    match filename {
        Some(filename) => match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some("cn") => {
                let source = read_or_die(filename);
                if tokens_only {
                    dump_tokens(&source, no_color, pretty);
                } else if dis {
                    disassemble_source(&source, cfg);
                } else if build {
                    build_bundle(&source, filename);
                } else {
                    run_source(&source, trace);
                }
            }
            Some("cnb") => {
                let bytes = match fs::read(filename) {
                    Ok(b) => b,
                    Err(e) => {
                        eprintln!("Failed to read '{}': {}", filename, e);
                        process::exit(1);
                    }
                };
                let program = match Program::from_bundle(&bytes) {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("'{}' is not a valid bundle: {}", filename, e);
                        process::exit(1);
                    }
                };
                if dis {
                    print_disassembly(&program, cfg);
                } else {
                    run_program(&program, trace);
                }
            }
            _ => {
                eprintln!("Error: expected a .cn or .cnb file, got {}", filename);
                process::exit(1);
            }
        },
        None => {
            if let Err(e) = repl::run_repl(trace) {
                eprintln!("REPL error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("CINDER - blinded-bytecode scripting toolchain");
    println!();
    println!("Usage:");
    println!("  cinder                    Start the interactive REPL");
    println!("  cinder <file.cn>          Compile and run a program");
    println!("  cinder <file.cnb>         Run a compiled bundle");
    println!("  cinder --build <file.cn>  Compile to a .cnb bundle");
    println!("  cinder --dis <file>       Disassemble instead of running");
    println!("  cinder --cfg              With --dis: include CFG edges");
    println!("  cinder --tokens <file>    Show tokens only");
    println!("  cinder --trace            Log every instruction and memory access");
    println!("  cinder --help, -h         Show this help");
}

fn read_or_die(filename: &str) -> String {
    match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn compile_or_die(source: &str) -> Program {
    match compile_default(source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let tokens = Lexer::new(source).tokenize();
    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }
    dumper.dump(&tokens);
}

fn disassemble_source(source: &str, cfg: bool) {
    let program = compile_or_die(source);
    print_disassembly(&program, cfg);
}

fn print_disassembly(program: &Program, cfg: bool) {
    let options = DisasmOptions {
        include_cfg: cfg,
        ..DisasmOptions::default()
    };
    match disassemble(&program.container, &program.strings, &options) {
        Ok(listing) => println!("{}", listing),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn build_bundle(source: &str, filename: &str) {
    let program = compile_or_die(source);
    let out_path = Path::new(filename).with_extension("cnb");
    let bytes = match program.to_bundle() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to encode bundle: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = fs::write(&out_path, bytes) {
        eprintln!("Failed to write '{}': {}", out_path.display(), e);
        process::exit(1);
    }
    println!("wrote {}", out_path.display());
}

fn run_source(source: &str, trace: bool) {
    let program = compile_or_die(source);
    run_program(&program, trace);
}

fn run_program(program: &Program, trace: bool) {
    let mut host = HostApi::default();
    host.debug = trace;
    let mut vm = Vm::new(host);
    if let Err(e) = vm.interpret(program) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
