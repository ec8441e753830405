//! Host-side driver for the Octet VM
//!
//! Owns a machine together with its diagnostic sink and drives it to
//! completion, optionally bounded by a step budget.

use std::io::Write;

use log::warn;

use crate::core::NUM_REGISTERS;
use crate::error::{Fault, LoadError};
use crate::machine::{Status, VirtualMachine};

/// Run-time settings for a [`Host`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunConfig {
    /// Stop after this many instructions. `None` runs until HALT or a fault.
    pub max_steps: Option<u64>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-spec",
    derive(serde::Serialize),
    serde(tag = "status", content = "fault", rename_all = "snake_case")
)]
pub enum Outcome {
    Halted,
    Faulted(String),
    StepLimit,
}

/// Final machine state after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-spec", derive(serde::Serialize))]
pub struct RunReport {
    pub outcome: Outcome,
    pub steps: u64,
    pub pc: u16,
    pub sp: u16,
    pub registers: [u8; NUM_REGISTERS],
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Halted
    }

    #[cfg(feature = "serde-spec")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde-spec")]
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

pub struct Host<W: Write> {
    pub vm: VirtualMachine,
    out: W,
    config: RunConfig,
}

impl<W: Write> Host<W> {
    pub fn new(out: W, config: RunConfig) -> Self {
        Self {
            vm: VirtualMachine::new(),
            out,
            config,
        }
    }

    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.vm.load(program)
    }

    /// Execute a single instruction, writing into the host's sink.
    pub fn step(&mut self) -> Result<Status, Fault> {
        self.vm.step(&mut self.out)
    }

    /// Run until HALT, a fault or the step budget is spent.
    pub fn run(&mut self) -> RunReport {
        let start = self.vm.steps();
        loop {
            if !self.vm.is_running() {
                let outcome = match self.vm.last_fault() {
                    Some(fault) => Outcome::Faulted(fault.to_string()),
                    None => Outcome::Halted,
                };
                return self.report(outcome);
            }

            if let Some(max) = self.config.max_steps {
                if self.vm.steps() - start >= max {
                    warn!("step budget of {max} exhausted at pc {:#06x}", self.vm.pc());
                    return self.report(Outcome::StepLimit);
                }
            }

            // Faults are recorded by the machine and picked up above
            let _ = self.step();
        }
    }

    pub fn reset(&mut self) {
        self.vm.reset();
    }

    pub fn report(&self, outcome: Outcome) -> RunReport {
        RunReport {
            outcome,
            steps: self.vm.steps(),
            pc: self.vm.pc(),
            sp: self.vm.sp(),
            registers: *self.vm.registers(),
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

/// Load `program` into a fresh machine and run it.
pub fn run_program<W: Write>(
    program: &[u8],
    out: W,
    config: RunConfig,
) -> Result<(RunReport, W), LoadError> {
    let mut host = Host::new(out, config);
    host.load(program)?;
    let report = host.run();
    Ok((report, host.into_output()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::STACK_EMPTY;
    use crate::demo::demo_program;
    use pretty_assertions::assert_eq;

    #[test]
    fn runs_demo_to_halt() {
        let program = demo_program("factorial").unwrap().unwrap();
        let (report, out) = run_program(&program, Vec::new(), RunConfig::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Halted);
        assert!(report.is_success());
        assert_eq!(report.registers[1], 120);
        assert_eq!(report.sp, STACK_EMPTY);
        assert_eq!(out, b"120\n");
    }

    #[test]
    fn step_budget_stops_infinite_loop() {
        let config = RunConfig { max_steps: Some(10) };
        let (report, _) = run_program(&[0x06, 0x00, 0x00], Vec::new(), config).unwrap();
        assert_eq!(report.outcome, Outcome::StepLimit);
        assert_eq!(report.steps, 10);
        assert!(!report.is_success());
    }

    #[test]
    fn fault_is_reported() {
        let (report, out) = run_program(&[0x0A, 0x09], Vec::new(), RunConfig::default()).unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Faulted("invalid register 9".to_string())
        );
        assert_eq!(report.steps, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "fault: invalid register 9\n");
    }

    #[test]
    fn oversized_program_is_a_load_error() {
        let result = run_program(&[0u8; 300], Vec::new(), RunConfig::default());
        assert!(matches!(result, Err(LoadError::ProgramTooLarge { size: 300, .. })));
    }

    #[test]
    fn host_reuse_after_reset() {
        let mut host = Host::new(Vec::new(), RunConfig::default());
        host.load(&[0x05, 0, 1, 2]).unwrap(); // DIV r0 / r1 (zero)
        assert!(matches!(host.run().outcome, Outcome::Faulted(_)));

        host.reset();
        host.load(&demo_program("sum").unwrap().unwrap()).unwrap();
        let report = host.run();
        assert_eq!(report.outcome, Outcome::Halted);
        assert!(host.output().ends_with(b"8\n"));
    }

    #[test]
    fn reload_without_reset_reports_the_new_run() {
        let mut host = Host::new(Vec::new(), RunConfig::default());
        host.load(&[0x0A, 0x09]).unwrap(); // PRINT r9
        assert_eq!(
            host.run().outcome,
            Outcome::Faulted("invalid register 9".to_string())
        );

        // pc is left past the faulting PRINT, so pad with HALTs
        host.load(&[0x00, 0x00, 0x00]).unwrap();
        let report = host.run();
        assert_eq!(report.outcome, Outcome::Halted);
        assert!(report.is_success());
    }

    #[cfg(feature = "serde-spec")]
    #[test]
    fn report_serializes() {
        let program = demo_program("sum").unwrap().unwrap();
        let (report, _) = run_program(&program, Vec::new(), RunConfig::default()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcome"]["status"], "halted");
        assert_eq!(json["registers"][2], 8);

        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("steps: 5"));
    }
}
