use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::bytecode::compile::compile_default;
use crate::bytecode::disasm::{DisasmOptions, disassemble};
use crate::lang::value::Value;
use crate::runtime::host::HostApi;
use crate::runtime::vm::Vm;

/// Interactive front end: reads lines, feeds them to the compiler, and runs
/// them on one persistent machine, so bindings, memory and memBase survive
/// from line to line.
pub fn run_repl(debug: bool) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;

    let mut host = HostApi::default();
    host.debug = debug;
    // classic stack-print escape hatch for poking at programs
    host.register_op("PRINT", |vm| {
        let v = vm.pop()?;
        println!("[PRINT] {}", v);
        Ok(None)
    });
    let mut vm = Vm::new(host);

    println!("cinder REPL ready. Commands:");
    println!("- :dis <code>   (compile + disassemble)");
    println!("- :run <code>   (compile + run, report sp/steps)");
    println!("- :mem <base>   (set memBase)");
    println!("- :quit");

    loop {
        match editor.readline("cinder> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);

                if trimmed == ":quit" || trimmed == ":q" {
                    break;
                }
                dispatch(&mut vm, trimmed);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C (:quit to exit)");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }
    println!("bye");
    Ok(())
}

fn dispatch(vm: &mut Vm, line: &str) {
    if let Some(rest) = line.strip_prefix(":mem") {
        match rest.trim().parse::<u32>() {
            Ok(base) => {
                vm.set_mem_base(base);
                println!("memBase = {}", vm.mem_base());
            }
            Err(_) => eprintln!("usage: :mem <base>"),
        }
        return;
    }

    if let Some(code) = line.strip_prefix(":dis") {
        match compile_default(code) {
            Ok(program) => {
                let options = DisasmOptions {
                    include_cfg: true,
                    ..DisasmOptions::default()
                };
                match disassemble(&program.container, &program.strings, &options) {
                    Ok(listing) => println!("{}", listing),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
        return;
    }

    if let Some(code) = line.strip_prefix(":run") {
        run_line(vm, code);
        println!("VM done. sp={} steps={}", vm.sp(), vm.steps());
        return;
    }

    run_line(vm, line);
    if let Some(top) = vm.stack().last() {
        if !matches!(top, Value::Undefined) {
            println!("{}", top);
        }
    }
}

fn run_line(vm: &mut Vm, code: &str) {
    match compile_default(code) {
        Ok(program) => {
            if let Err(e) = vm.interpret(&program) {
                eprintln!("Error: {}", e);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
