use std::{
    error,
    fmt::Display,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use clap::Parser;

pub mod cpu;
pub mod inst;
pub mod op;
pub mod sample;

pub use cpu::{Cpu, RunOutcome, StopReason};
pub use inst::Instruction;
pub use op::OpCode;

#[derive(Debug)]
pub enum Error {
    IOError(io::Error),
    InstructionFormatError(String),
    RoundTripError(String),
    UnknownOpCode(String),
    MissingIpBinding,
    InvalidRegisterIndex(i64),
    InvalidRegisterCount(usize),
    ArithmeticOverflow(OpCode, i64, i64),
    SampleParseError(String),
    InvalidOpNumber(i64),
    AmbiguousOpCodes(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IOError(ioe) => write!(f, "I/O error: {}", ioe),
            Error::InstructionFormatError(s) => write!(f, "Failed to parse instruction text({})", s),
            Error::RoundTripError(s) => write!(
                f,
                "Instruction text({}) doesn't match its own rendering after parsing",
                s
            ),
            Error::UnknownOpCode(s) => write!(f, "Unknown operation code({})", s),
            Error::MissingIpBinding => write!(
                f,
                "Program doesn't start with an instruction pointer binding(#ip)"
            ),
            Error::InvalidRegisterIndex(ind) => write!(f, "Invalid register index({})", ind),
            Error::InvalidRegisterCount(n) => write!(
                f,
                "Invalid register count({}), expect in range([1, {}])",
                n,
                MAX_REGISTER_COUNT
            ),
            Error::ArithmeticOverflow(op, a, b) => {
                write!(f, "Operation {} overflows on operands({}, {})", op, a, b)
            }
            Error::SampleParseError(s) => write!(f, "Failed to parse sample text({})", s),
            Error::InvalidOpNumber(n) => write!(f, "No operation is known for number({})", n),
            Error::AmbiguousOpCodes(n) => write!(
                f,
                "Samples leave {} operation number(s) without a single matching operation",
                n
            ),
        }
    }
}

impl error::Error for Error {}

#[derive(Debug, Parser)]
pub struct RunArgs {
    pub input_path: PathBuf,
    /// Initial register values, comma separated; missing ones are zero.
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    pub registers: Vec<i64>,
    #[arg(long, default_value_t = DEFAULT_REGISTER_COUNT)]
    pub register_count: usize,
    /// Stop after this many executed instructions.
    #[arg(long)]
    pub max_steps: Option<u64>,
    /// Stop before executing the instruction at this pointer.
    #[arg(long)]
    pub break_at: Option<usize>,
    /// Print every executed step.
    #[arg(long)]
    pub trace: bool,
}

#[derive(Debug, Parser)]
pub struct SampleArgs {
    pub input_path: PathBuf,
}

pub const MAX_REGISTER_COUNT: usize = 6;
pub const DEFAULT_REGISTER_COUNT: usize = MAX_REGISTER_COUNT;

/// Register file of the CPU.
///
/// Slots past `len` are always zero, so the derived comparisons only see the
/// live registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    values: [i64; MAX_REGISTER_COUNT],
    len: usize,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            values: [0; MAX_REGISTER_COUNT],
            len: DEFAULT_REGISTER_COUNT,
        }
    }
}

impl Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

impl Registers {
    pub fn zeroed(count: usize) -> Result<Self, Error> {
        if count == 0 || count > MAX_REGISTER_COUNT {
            return Err(Error::InvalidRegisterCount(count));
        }

        Ok(Registers {
            values: [0; MAX_REGISTER_COUNT],
            len: count,
        })
    }

    pub fn from_slice(values: &[i64]) -> Result<Self, Error> {
        let mut regs = Self::zeroed(values.len())?;
        regs.values[..values.len()].copy_from_slice(values);
        Ok(regs)
    }

    /// Register file of `count` registers, starting with `values` and zero
    /// filled after them.
    pub fn with_prefix(values: &[i64], count: usize) -> Result<Self, Error> {
        let mut regs = Self::zeroed(count)?;
        if values.len() > count {
            return Err(Error::InvalidRegisterCount(values.len()));
        }
        regs.values[..values.len()].copy_from_slice(values);
        Ok(regs)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values[..self.len]
    }

    pub fn get(&self, ind: i64) -> Result<i64, Error> {
        self.slot(ind).map(|i| self.values[i])
    }

    /// Returns the register file with register `ind` replaced by `value`.
    pub fn with(mut self, ind: i64, value: i64) -> Result<Self, Error> {
        let i = self.slot(ind)?;
        self.values[i] = value;
        Ok(self)
    }

    fn slot(&self, ind: i64) -> Result<usize, Error> {
        usize::try_from(ind)
            .ok()
            .filter(|&i| i < self.len)
            .ok_or(Error::InvalidRegisterIndex(ind))
    }
}

fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let file = File::open(path).map_err(Error::IOError)?;
    let reader = BufReader::new(file);
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::IOError)
}

pub fn parse_program(text: &str) -> Result<Vec<Instruction>, Error> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(Instruction::try_from)
        .collect()
}

pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<Instruction>, Error> {
    read_lines(path)?
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| Instruction::try_from(l.as_str()))
        .collect::<Result<Vec<_>, _>>()
}

pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<sample::SampleFile, Error> {
    let lines = read_lines(path)?;
    sample::SampleFile::parse(&lines.join("\n"))
}

#[test]
fn test_registers_bounds() {
    let regs = Registers::from_slice(&[3, 5, 7, 11]).unwrap();
    assert_eq!(regs.len(), 4);
    assert_eq!(regs.get(3).unwrap(), 11);
    assert!(matches!(regs.get(4), Err(Error::InvalidRegisterIndex(4))));
    assert!(matches!(regs.get(-1), Err(Error::InvalidRegisterIndex(-1))));
    assert!(matches!(
        Registers::zeroed(7),
        Err(Error::InvalidRegisterCount(7))
    ));
}

#[test]
fn test_registers_value_semantics() {
    let before = Registers::from_slice(&[3, 5, 7, 11]).unwrap();
    let after = before.with(0, 42).unwrap();
    assert_eq!(before.as_slice(), &[3, 5, 7, 11]);
    assert_eq!(after.as_slice(), &[42, 5, 7, 11]);
    assert_eq!(format!("{}", after), "[42, 5, 7, 11]");
}

#[test]
fn test_registers_with_prefix() {
    let regs = Registers::with_prefix(&[1], 6).unwrap();
    assert_eq!(regs.as_slice(), &[1, 0, 0, 0, 0, 0]);
    assert_eq!(regs, Registers::default().with(0, 1).unwrap());
    assert!(Registers::with_prefix(&[1, 2, 3], 2).is_err());
}
