use anyhow::{Context, Result};
use clap::Parser;
use elf_cpu::{Cpu, Registers, RunArgs};

fn main() -> Result<()> {
    env_logger::init();
    let args = RunArgs::parse();
    let program = elf_cpu::load_program(&args.input_path).with_context(|| {
        format!(
            "Failed to load program from given input file({}).",
            args.input_path.display()
        )
    })?;
    let regs = Registers::with_prefix(&args.registers, args.register_count)
        .context("Failed to build initial registers.")?;

    let mut cpu = if args.trace {
        Cpu::with_trace(regs)
    } else {
        Cpu::new(regs)
    };
    if let Some(ip) = args.break_at {
        cpu.set_break_at(ip);
    }

    let outcome = cpu
        .run(&program, args.max_steps)
        .with_context(|| format!("Failed to run program, registers are {}.", cpu.registers()))?;
    if let Some(trace) = cpu.trace() {
        for (ip, regs) in trace {
            println!("ip={} {}", ip, regs);
        }
    }
    println!(
        "Program {} after {} steps(ip = {}), registers are {}.",
        outcome.reason,
        outcome.steps,
        cpu.ip(),
        cpu.registers()
    );

    Ok(())
}
