use anyhow::{Context, Result};
use clap::Parser;
use elf_cpu::{
    sample::{self, OpTable},
    Registers, SampleArgs,
};

const AMBIGUOUS_THRESHOLD: usize = 3;
const PROGRAM_REGISTER_COUNT: usize = 4;

fn main() -> Result<()> {
    env_logger::init();
    let args = SampleArgs::parse();
    let file = elf_cpu::load_samples(&args.input_path).with_context(|| {
        format!(
            "Failed to load samples from given input file({}).",
            args.input_path.display()
        )
    })?;

    let ambiguous_count = sample::count_ambiguous(&file.samples, AMBIGUOUS_THRESHOLD);
    println!(
        "Found {} of {} samples behave like {} or more operations.",
        ambiguous_count,
        file.samples.len(),
        AMBIGUOUS_THRESHOLD
    );

    let table = OpTable::deduce(&file.samples).context("Failed to deduce operation numbers.")?;
    for (number, op) in table.entries() {
        println!("{:>2} => {}", number, op);
    }

    let regs = table
        .run(&file.program, Registers::zeroed(PROGRAM_REGISTER_COUNT)?)
        .context("Failed to run the numbered program.")?;
    println!(
        "After running the program, register 0 is {} (registers are {}).",
        regs.get(0)?,
        regs
    );

    Ok(())
}
