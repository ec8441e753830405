use crate::asm::{AsmError, assemble};

/// Names accepted by [`demo_program`].
pub const DEMO_NAMES: [&str; 4] = ["sum", "countdown", "factorial", "reverse"];

const SUM_SOURCE: &str = r#"
; 5 + 3, printed
    LOAD r0, 5
    LOAD r1, 3
    ADD  r0, r1, r2
    PRINT r2
    HALT
"#;

const COUNTDOWN_SOURCE: &str = r#"
; Print 3, 2, 1
    LOAD r0, 3
    LOAD r1, 1
loop:
    JZ   r0, done
    PRINT r0
    SUB  r0, r1, r0
    JMP  loop
done:
    HALT
"#;

const FACTORIAL_SOURCE: &str = r#"
; 5! = 120
    LOAD r0, 5          ; n
    LOAD r1, 1          ; accumulator
    LOAD r2, 1
loop:
    JZ   r0, done
    MUL  r1, r0, r1
    SUB  r0, r2, r0
    JMP  loop
done:
    PRINT r1
    HALT
"#;

const REVERSE_SOURCE: &str = r#"
; Reverse three values through the stack
    LOAD r0, 1
    LOAD r1, 2
    LOAD r2, 3
    PUSH r0
    PUSH r1
    PUSH r2
    POP  r3
    PRINT r3
    POP  r4
    PRINT r4
    POP  r5
    PRINT r5
    HALT
"#;

/// Assembly source of a bundled program.
pub fn demo_source(name: &str) -> Option<&'static str> {
    match name {
        "sum" => Some(SUM_SOURCE),
        "countdown" => Some(COUNTDOWN_SOURCE),
        "factorial" => Some(FACTORIAL_SOURCE),
        "reverse" => Some(REVERSE_SOURCE),
        _ => None,
    }
}

/// Assemble a bundled program, or `None` for an unknown name.
pub fn demo_program(name: &str) -> Option<Result<Vec<u8>, AsmError>> {
    demo_source(name).map(|source| assemble(source).map(|program| program.bytes))
}
