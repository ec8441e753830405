// Copyright (C) 2025 Dayton Fishell
// Octet 8-bit Virtual Machine
// This file is part of Octet.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

// Command-line front end for the Octet VM.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::info;

use octet_core::demo::{DEMO_NAMES, demo_program};
use octet_core::{RunConfig, RunReport, assemble, disassemble, run_program};

#[derive(Parser, Debug)]
#[command(name = "octet", version, about = "Octet 8-bit bytecode virtual machine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a bytecode file, or a `.asm` source file
    Run {
        file: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Assemble source into a bytecode file
    Asm {
        source: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Print a listing of a bytecode file
    Disasm { file: PathBuf },
    /// Run one of the bundled programs
    Demo {
        name: String,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Stop after this many instructions
    #[arg(long, value_name = "COUNT")]
    max_steps: Option<u64>,

    /// Print a machine report to stdout after the run
    #[cfg(feature = "serde-spec")]
    #[arg(long, value_enum, value_name = "FORMAT")]
    report: Option<ReportFormat>,
}

#[cfg(feature = "serde-spec")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ReportFormat {
    Json,
    Yaml,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, run } => {
            let program = read_program(&file)?;
            execute(&program, &run)
        }
        Command::Asm { source, output } => {
            let text = fs::read_to_string(&source)
                .with_context(|| format!("reading {}", source.display()))?;
            let program =
                assemble(&text).with_context(|| format!("assembling {}", source.display()))?;
            fs::write(&output, &program.bytes)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("wrote {} bytes to {}", program.bytes.len(), output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Disasm { file } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            for line in disassemble(&bytes) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Demo { name, run } => {
            let program = demo_program(&name)
                .ok_or_else(|| {
                    anyhow!("unknown demo `{name}` (try one of: {})", DEMO_NAMES.join(", "))
                })?
                .context("assembling bundled demo")?;
            execute(&program, &run)
        }
    }
}

/// Load raw bytecode, assembling first when the file is `.asm` source.
fn read_program(path: &Path) -> Result<Vec<u8>> {
    if path.extension().is_some_and(|ext| ext == "asm") {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let program = assemble(&text).with_context(|| format!("assembling {}", path.display()))?;
        Ok(program.bytes)
    } else {
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn execute(program: &[u8], args: &RunArgs) -> Result<ExitCode> {
    let config = RunConfig {
        max_steps: args.max_steps,
    };
    // PRINT output and fault lines share the diagnostic channel
    let (report, _) = run_program(program, io::stderr(), config)?;
    info!("{:?} after {} steps", report.outcome, report.steps);

    emit_report(&report, args)?;

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(feature = "serde-spec")]
fn emit_report(report: &RunReport, args: &RunArgs) -> Result<()> {
    match args.report {
        Some(ReportFormat::Json) => println!("{}", report.to_json()?),
        Some(ReportFormat::Yaml) => print!("{}", report.to_yaml()?),
        None => {}
    }
    Ok(())
}

#[cfg(not(feature = "serde-spec"))]
fn emit_report(_report: &RunReport, _args: &RunArgs) -> Result<()> {
    Ok(())
}
