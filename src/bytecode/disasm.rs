use crate::bytecode::container::{Container, ContainerError};
use crate::bytecode::op::Op;

/// Disassembly rendering options.
#[derive(Debug, Clone)]
pub struct DisasmOptions {
    /// Prefix each line with its body-relative byte offset.
    pub show_offsets: bool,
    /// Compute and print jump targets next to relative offsets.
    pub annotate_jumps: bool,
    /// Render string-table operands as their text instead of `str#N`.
    pub resolve_strings: bool,
    /// Append the list of jump edges as a trivial control-flow graph.
    pub include_cfg: bool,
}

impl Default for DisasmOptions {
    fn default() -> Self {
        DisasmOptions {
            show_offsets: true,
            annotate_jumps: true,
            resolve_strings: true,
            include_cfg: false,
        }
    }
}

/// Decode a container and print its instructions. Replays exactly the same
/// de-blinding the VM fetch path uses (same seed, same keystream, same byte
/// offsets), which makes this a correctness cross-check on the protocol:
/// if the listing is garbage, so is execution.
///
/// Offsets in the listing are body-relative, matching the VM's instruction
/// pointer.
pub fn disassemble(
    container: &[u8],
    strings: &[String],
    options: &DisasmOptions,
) -> Result<String, ContainerError> {
    let body = Container::parse(container)?.body;

    let mut lines = Vec::new();
    let mut edges: Vec<(usize, i64)> = Vec::new();
    let mut ip = 0usize;

    let label = |idx: u8| -> String {
        if options.resolve_strings {
            match strings.get(idx as usize) {
                Some(s) => s.clone(),
                None => format!("str#{}", idx),
            }
        } else {
            format!("str#{}", idx)
        }
    };

    while ip < body.len() {
        let at = ip;
        let byte = body[ip];
        ip += 1;

        let Some(op) = Op::from_byte(byte) else {
            lines.push(render(options, at, &format!("OP_{:02x}", byte), ""));
            continue;
        };

        // operand bytes, tolerating a body that ends mid-instruction
        let want = op.operand_bytes();
        let avail = body.len() - ip;
        if avail < want {
            lines.push(render(options, at, op.mnemonic(), "<truncated>"));
            break;
        }
        let operands = &body[ip..ip + want];
        ip += want;

        let text = match op {
            Op::PushU8 | Op::NewArr | Op::CallAny => {
                let prefix = if op == Op::CallAny { "argc=" } else { "" };
                format!("{}{}", prefix, operands[0])
            }
            Op::PushI32 => {
                let v = i32::from_be_bytes([operands[0], operands[1], operands[2], operands[3]]);
                format!("{}", v)
            }
            Op::PushStr | Op::Load | Op::Store | Op::LoadHost | Op::Cast | Op::Custom => {
                label(operands[0])
            }
            Op::Decl => format!("{}, flags={}", label(operands[0]), operands[1]),
            Op::MakeFn => {
                let entry = ((operands[2] as usize) << 8) | operands[3] as usize;
                format!(
                    "{}, nparams={}, entry={}",
                    label(operands[0]),
                    operands[1],
                    entry
                )
            }
            Op::Jmp | Op::Jz | Op::Jnz => {
                let rel = operands[0] as i8;
                let target = ip as i64 + rel as i64;
                if options.annotate_jumps {
                    edges.push((at, target));
                    format!("rel={} -> {}", rel, target)
                } else {
                    format!("rel={}", rel)
                }
            }
            _ => String::new(),
        };

        lines.push(render(options, at, op.mnemonic(), &text));
    }

    let mut out = lines.join("\n");
    if options.include_cfg {
        out.push_str("\n\nCFG edges:");
        for (from, to) in &edges {
            out.push_str(&format!("\n  {} -> {}", from, to));
        }
    }
    Ok(out)
}

fn render(options: &DisasmOptions, at: usize, mnemonic: &str, operands: &str) -> String {
    let offset = if options.show_offsets {
        format!("@{:>6}  ", at)
    } else {
        String::new()
    };
    if operands.is_empty() {
        format!("{}{}", offset, mnemonic)
    } else {
        format!("{}{} {}", offset, mnemonic, operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile_default;

    fn disasm(src: &str, options: &DisasmOptions) -> String {
        let program = compile_default(src).unwrap();
        disassemble(&program.container, &program.strings, options).unwrap()
    }

    #[test]
    fn test_annotates_jump_targets() {
        let out = disasm("if (0) 1; else 2;", &DisasmOptions::default());
        // JZ at 5 jumps over the then-branch and the JMP to 14
        assert!(out.contains("JZ rel=7 -> 14"), "got:\n{}", out);
        assert!(out.contains("JMP rel=5 -> 19"), "got:\n{}", out);
    }

    #[test]
    fn test_backward_jump_annotation() {
        let out = disasm("while (0) { }", &DisasmOptions::default());
        assert!(out.contains("JMP rel=-11 -> 0"), "got:\n{}", out);
    }

    #[test]
    fn test_resolves_string_operands() {
        let out = disasm("let x = 1;", &DisasmOptions::default());
        assert!(out.contains("DECL x, flags=2"), "got:\n{}", out);

        let out = disasm(
            "let x = 1;",
            &DisasmOptions {
                resolve_strings: false,
                ..DisasmOptions::default()
            },
        );
        assert!(out.contains("DECL str#0, flags=2"), "got:\n{}", out);
    }

    #[test]
    fn test_offsets_toggle() {
        let on = disasm("42;", &DisasmOptions::default());
        assert!(on.contains("@     0  PUSH_I32 42"), "got:\n{}", on);

        let off = disasm(
            "42;",
            &DisasmOptions {
                show_offsets: false,
                ..DisasmOptions::default()
            },
        );
        assert!(off.starts_with("PUSH_I32 42"), "got:\n{}", off);
    }

    #[test]
    fn test_cfg_edge_list() {
        let out = disasm(
            "while (0) { }",
            &DisasmOptions {
                include_cfg: true,
                ..DisasmOptions::default()
            },
        );
        assert!(out.contains("CFG edges:"), "got:\n{}", out);
        assert!(out.contains("  5 -> 11"), "got:\n{}", out);
        assert!(out.contains("  9 -> 0"), "got:\n{}", out);
    }

    #[test]
    fn test_make_fn_operands() {
        let out = disasm("function f(a) { return a; }", &DisasmOptions::default());
        assert!(out.contains("MAKE_FN f, nparams=1, entry=2"), "got:\n{}", out);
    }

    #[test]
    fn test_call_any_argc() {
        let out = disasm("f(1, 2);", &DisasmOptions::default());
        assert!(out.contains("CALL_ANY argc=2"), "got:\n{}", out);
    }

    #[test]
    fn test_rejects_corrupt_container() {
        let program = compile_default("1;").unwrap();
        let mut bytes = program.container.clone();
        bytes[1] = 0x09;
        assert_eq!(
            disassemble(&bytes, &program.strings, &DisasmOptions::default()),
            Err(ContainerError::BadVersion { got: 0x09 })
        );
    }

    #[test]
    fn test_disassembly_matches_vm_decode() {
        // same container, same decode: every mnemonic the disassembler
        // prints must be a byte the VM would dispatch
        let program = compile_default("let i = 0; do { i = i + 1; } while (i < 3);").unwrap();
        let out =
            disassemble(&program.container, &program.strings, &DisasmOptions::default()).unwrap();
        for line in out.lines() {
            assert!(!line.contains("OP_"), "undecodable byte in: {}", line);
        }
    }
}
