//! Text assembler and disassembler for Octet bytecode.
//!
//! ```text
//! ; comments run to end of line
//! start:  LOAD r0, 5
//!         JZ   r0, done
//!         JMP  start
//! done:   HALT
//!         DB   0x10, 0x20      ; raw bytes
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::core::NUM_REGISTERS;
use crate::isa::{Instruction, Opcode};

/// Result of running the assembler.
#[derive(Debug)]
pub struct AssembledProgram {
    pub bytes: Vec<u8>,
    pub labels: HashMap<String, u16>,
}

/// Errors produced while assembling source text. Line numbers are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: unknown instruction `{token}`")]
    UnknownInstruction { line: usize, token: String },
    #[error("line {line}: {instruction} is missing an operand")]
    MissingOperand { line: usize, instruction: String },
    #[error("line {line}: unexpected operand for {instruction}")]
    UnexpectedOperand { line: usize, instruction: String },
    #[error("line {line}: invalid number `{operand}`")]
    InvalidNumber { line: usize, operand: String },
    #[error("line {line}: invalid register `{operand}`")]
    InvalidRegister { line: usize, operand: String },
    #[error("line {line}: value {value} does not fit in {bits} bits")]
    OutOfRange { line: usize, value: u32, bits: u32 },
    #[error("line {line}: duplicate label `{name}`")]
    DuplicateLabel { line: usize, name: String },
    #[error("line {line}: label `{name}` not found")]
    LabelNotFound { line: usize, name: String },
    #[error("line {line}: invalid label `{name}`")]
    InvalidLabel { line: usize, name: String },
    #[error("line {line}: address {address:#x} is past the 16-bit address space")]
    AddressOverflow { line: usize, address: usize },
}

enum Target {
    Address(u16),
    Label(String),
}

enum Item {
    Fixed(Instruction),
    Jmp(Target),
    Jz { reg: u8, target: Target },
    Bytes(Vec<u8>),
}

struct RawItem {
    item: Item,
    line: usize,
}

impl Item {
    fn len(&self) -> usize {
        match self {
            Item::Fixed(inst) => inst.len(),
            Item::Jmp(_) => 1 + Opcode::Jmp.operand_count(),
            Item::Jz { .. } => 1 + Opcode::Jz.operand_count(),
            Item::Bytes(bytes) => bytes.len(),
        }
    }
}

/// Assemble source text into bytecode and label positions.
///
/// Labels may be used before they are defined. The result is not checked
/// against the memory size; the loader does that.
pub fn assemble(source: &str) -> Result<AssembledProgram, AsmError> {
    let mut labels = HashMap::new();
    let mut items = Vec::new();
    let mut address = 0usize;

    for (line_idx, text) in source.lines().enumerate() {
        let line = line_idx + 1;
        let mut working = text.split(';').next().unwrap_or("").trim();

        while let Some(colon) = working.find(':') {
            let label = working[..colon].trim();
            if !is_label_name(label) {
                return Err(AsmError::InvalidLabel {
                    line,
                    name: label.to_string(),
                });
            }
            if labels.contains_key(label) {
                return Err(AsmError::DuplicateLabel {
                    line,
                    name: label.to_string(),
                });
            }
            let at =
                u16::try_from(address).map_err(|_| AsmError::AddressOverflow { line, address })?;
            labels.insert(label.to_string(), at);
            working = working[colon + 1..].trim();
        }

        if working.is_empty() {
            continue;
        }

        let mut parts = working
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty());
        let Some(mnemonic) = parts.next() else {
            continue;
        };
        let operands: Vec<&str> = parts.collect();

        let item = parse_item(mnemonic, &operands, line)?;
        address += item.len();
        items.push(RawItem { item, line });
    }

    let mut bytes = Vec::with_capacity(address);
    for RawItem { item, line } in items {
        match item {
            Item::Fixed(inst) => inst.encode(&mut bytes),
            Item::Jmp(target) => {
                let addr = resolve(&target, &labels, line)?;
                Instruction::Jmp { addr }.encode(&mut bytes);
            }
            Item::Jz { reg, target } => {
                let addr = resolve(&target, &labels, line)?;
                Instruction::Jz { reg, addr }.encode(&mut bytes);
            }
            Item::Bytes(raw) => bytes.extend_from_slice(&raw),
        }
    }

    Ok(AssembledProgram { bytes, labels })
}

/// Labels are identifiers: a letter or `_`, then letters, digits or `_`.
fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_item(mnemonic: &str, operands: &[&str], line: usize) -> Result<Item, AsmError> {
    if mnemonic.eq_ignore_ascii_case("DB") {
        if operands.is_empty() {
            return Err(AsmError::MissingOperand {
                line,
                instruction: "DB".to_string(),
            });
        }
        let bytes = operands
            .iter()
            .map(|op| parse_byte(op, line))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Item::Bytes(bytes));
    }

    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownInstruction {
        line,
        token: mnemonic.to_string(),
    })?;

    let expected = match opcode {
        Opcode::Jmp => 1,
        Opcode::Jz => 2,
        other => other.operand_count(),
    };
    if operands.len() < expected {
        return Err(AsmError::MissingOperand {
            line,
            instruction: opcode.mnemonic().to_string(),
        });
    }
    if operands.len() > expected {
        return Err(AsmError::UnexpectedOperand {
            line,
            instruction: opcode.mnemonic().to_string(),
        });
    }

    let reg = |i: usize| parse_register(operands[i], line);
    let item = match opcode {
        Opcode::Halt => Item::Fixed(Instruction::Halt),
        Opcode::Load => Item::Fixed(Instruction::Load {
            reg: reg(0)?,
            value: parse_byte(operands[1], line)?,
        }),
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
            let (a, b, dst) = (reg(0)?, reg(1)?, reg(2)?);
            Item::Fixed(match opcode {
                Opcode::Add => Instruction::Add { a, b, dst },
                Opcode::Sub => Instruction::Sub { a, b, dst },
                Opcode::Mul => Instruction::Mul { a, b, dst },
                _ => Instruction::Div { a, b, dst },
            })
        }
        Opcode::Jmp => Item::Jmp(parse_target(operands[0], line)?),
        Opcode::Jz => Item::Jz {
            reg: reg(0)?,
            target: parse_target(operands[1], line)?,
        },
        Opcode::Push => Item::Fixed(Instruction::Push { reg: reg(0)? }),
        Opcode::Pop => Item::Fixed(Instruction::Pop { reg: reg(0)? }),
        Opcode::Print => Item::Fixed(Instruction::Print { reg: reg(0)? }),
    };
    Ok(item)
}

fn parse_number(token: &str, line: usize) -> Result<u32, AsmError> {
    let invalid = || AsmError::InvalidNumber {
        line,
        operand: token.to_string(),
    };
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| invalid())
    } else if let Some(hex) = token.strip_prefix('$') {
        u32::from_str_radix(hex, 16).map_err(|_| invalid())
    } else {
        token.parse::<u32>().map_err(|_| invalid())
    }
}

fn parse_byte(token: &str, line: usize) -> Result<u8, AsmError> {
    let value = parse_number(token, line)?;
    u8::try_from(value).map_err(|_| AsmError::OutOfRange {
        line,
        value,
        bits: 8,
    })
}

fn parse_register(token: &str, line: usize) -> Result<u8, AsmError> {
    let invalid = || AsmError::InvalidRegister {
        line,
        operand: token.to_string(),
    };
    let index = token
        .strip_prefix('r')
        .or_else(|| token.strip_prefix('R'))
        .ok_or_else(invalid)?
        .parse::<u8>()
        .map_err(|_| invalid())?;
    if (index as usize) < NUM_REGISTERS {
        Ok(index)
    } else {
        Err(invalid())
    }
}

fn parse_target(token: &str, line: usize) -> Result<Target, AsmError> {
    let starts_numeric = token.starts_with(|c: char| c.is_ascii_digit() || c == '$');
    if !starts_numeric {
        return Ok(Target::Label(token.to_string()));
    }
    let value = parse_number(token, line)?;
    u16::try_from(value)
        .map(Target::Address)
        .map_err(|_| AsmError::OutOfRange {
            line,
            value,
            bits: 16,
        })
}

fn resolve(target: &Target, labels: &HashMap<String, u16>, line: usize) -> Result<u16, AsmError> {
    match target {
        Target::Address(addr) => Ok(*addr),
        Target::Label(name) => labels
            .get(name)
            .copied()
            .ok_or_else(|| AsmError::LabelNotFound {
                line,
                name: name.clone(),
            }),
    }
}

/// One line of a disassembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub offset: usize,
    pub bytes: Vec<u8>,
    /// `None` for bytes that do not decode (illegal opcode or truncated
    /// operands); these are listed as `DB`.
    pub instruction: Option<Instruction>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        write!(f, "{:04X}  {:<12} ", self.offset, hex.join(" "))?;
        match &self.instruction {
            Some(inst) => write!(f, "{inst}"),
            None => {
                let raw: Vec<String> = self.bytes.iter().map(|b| format!("0x{b:02X}")).collect();
                write!(f, "DB {}", raw.join(", "))
            }
        }
    }
}

/// Decode a bytecode image into a listing.
pub fn disassemble(bytes: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let start = offset;
        let decoded = Opcode::try_from(bytes[start]).ok().and_then(|opcode| {
            let mut cursor = start + 1;
            Instruction::read(opcode, || {
                let byte = bytes.get(cursor).copied().ok_or(())?;
                cursor += 1;
                Ok::<u8, ()>(byte)
            })
            .ok()
        });

        let (len, instruction) = match decoded {
            Some(inst) => (inst.len(), Some(inst)),
            // Illegal opcode: one byte. Truncated tail: everything left.
            None if Opcode::try_from(bytes[start]).is_err() => (1, None),
            None => (bytes.len() - start, None),
        };

        lines.push(Line {
            offset: start,
            bytes: bytes[start..start + len].to_vec(),
            instruction,
        });
        offset += len;
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_simple_program() {
        let source = r#"
; sum two numbers
start:
    LOAD r0, 5
    LOAD r1 3
    ADD  r0, r1, r2
    PRINT r2
    HALT
"#;
        let program = assemble(source).expect("assemble");
        assert_eq!(program.labels.get("start"), Some(&0));
        assert_eq!(
            program.bytes,
            vec![0x01, 0, 5, 0x01, 1, 3, 0x02, 0, 1, 2, 0x0A, 2, 0x00]
        );
    }

    #[test]
    fn forward_and_backward_labels_resolve() {
        let source = r#"
top:    JZ r0, done
        JMP top
done:   HALT
"#;
        let program = assemble(source).expect("assemble");
        assert_eq!(program.labels.get("done"), Some(&7));
        assert_eq!(
            program.bytes,
            vec![0x07, 0, 0x00, 0x07, 0x06, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn db_and_numeric_forms() {
        let program = assemble("db 0x10, $20, 48\nJMP 0x0100").expect("assemble");
        assert_eq!(program.bytes, vec![0x10, 0x20, 48, 0x06, 0x01, 0x00]);
    }

    #[test]
    fn several_labels_on_one_line() {
        let program = assemble("a: b: halt").expect("assemble");
        assert_eq!(program.labels.get("a"), Some(&0));
        assert_eq!(program.labels.get("b"), Some(&0));
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert_eq!(
            assemble("HALT\nNOP").unwrap_err(),
            AsmError::UnknownInstruction {
                line: 2,
                token: "NOP".to_string()
            }
        );
        assert_eq!(
            assemble("LOAD r0").unwrap_err(),
            AsmError::MissingOperand {
                line: 1,
                instruction: "LOAD".to_string()
            }
        );
        assert_eq!(
            assemble("HALT r0").unwrap_err(),
            AsmError::UnexpectedOperand {
                line: 1,
                instruction: "HALT".to_string()
            }
        );
        assert_eq!(
            assemble("PUSH r8").unwrap_err(),
            AsmError::InvalidRegister {
                line: 1,
                operand: "r8".to_string()
            }
        );
        assert_eq!(
            assemble("LOAD r0, 256").unwrap_err(),
            AsmError::OutOfRange {
                line: 1,
                value: 256,
                bits: 8
            }
        );
        assert_eq!(
            assemble("JMP nowhere").unwrap_err(),
            AsmError::LabelNotFound {
                line: 1,
                name: "nowhere".to_string()
            }
        );
        assert!(matches!(
            assemble("x: HALT\nx: HALT"),
            Err(AsmError::DuplicateLabel { line: 2, .. })
        ));
    }

    #[test]
    fn labels_must_be_identifiers() {
        assert_eq!(
            assemble("HALT\nLOAD r0, 5 end: HALT").unwrap_err(),
            AsmError::InvalidLabel {
                line: 2,
                name: "LOAD r0, 5 end".to_string()
            }
        );
        assert!(matches!(
            assemble("5: HALT"),
            Err(AsmError::InvalidLabel { line: 1, .. })
        ));
        assert!(matches!(
            assemble(": HALT"),
            Err(AsmError::InvalidLabel { line: 1, .. })
        ));

        let program = assemble("_loop2: HALT").expect("assemble");
        assert_eq!(program.labels.get("_loop2"), Some(&0));
    }

    #[test]
    fn label_past_address_space_is_rejected() {
        let mut source = "DB 0\n".repeat(usize::from(u16::MAX) + 1);
        source.push_str("end: HALT\n");
        assert_eq!(
            assemble(&source).unwrap_err(),
            AsmError::AddressOverflow {
                line: usize::from(u16::MAX) + 2,
                address: 0x1_0000
            }
        );
    }

    #[test]
    fn listing_offsets_do_not_wrap() {
        let listing = disassemble(&vec![0x00; 0x1_0002]);
        let last = listing.last().expect("non-empty listing");
        assert_eq!(last.offset, 0x1_0001);
        assert!(last.to_string().starts_with("10001  00"));
    }

    #[test]
    fn disassembles_with_db_fallback() {
        let listing = disassemble(&[0x01, 0, 5, 0xEE, 0x06, 0x00, 0x03, 0x02, 0x01]);
        let text: Vec<String> = listing.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "0000  01 00 05     LOAD r0, 5".to_string(),
                "0003  EE           DB 0xEE".to_string(),
                "0004  06 00 03     JMP 0x0003".to_string(),
                "0007  02 01        DB 0x02, 0x01".to_string(),
            ]
        );
    }

    #[test]
    fn listing_reassembles_to_the_same_bytes() {
        let source = "LOAD r1, 9\nloop: JZ r1, end\nSUB r1, r2, r1\nJMP loop\nend: PRINT r1\nHALT";
        let program = assemble(source).expect("assemble");
        let relisted: String = disassemble(&program.bytes)
            .iter()
            .map(|l| format!("{}\n", l.instruction.expect("decodes")))
            .collect();
        assert_eq!(assemble(&relisted).expect("reassemble").bytes, program.bytes);
    }
}
