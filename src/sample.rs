//! Samples that show how one numbered instruction changed a register file,
//! and the numbered programs they help decode.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{op::Args, Error, OpCode, Registers};

/// Instruction whose operation is only known by number.
pub type NumberedInst = (i64, Args);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    before: Registers,
    inst: NumberedInst,
    after: Registers,
}

impl Sample {
    pub fn from_lines(before: &str, inst: &str, after: &str) -> Result<Self, Error> {
        static BEFORE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Before:\s*(.+)$").unwrap());
        static AFTER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^After:\s*(.+)$").unwrap());

        let before_caps = BEFORE_PATTERN
            .captures(before.trim())
            .ok_or(Error::SampleParseError(before.to_string()))?;
        let after_caps = AFTER_PATTERN
            .captures(after.trim())
            .ok_or(Error::SampleParseError(after.to_string()))?;
        let before = parse_registers(&before_caps[1])?;
        let after = parse_registers(&after_caps[1])?;
        if before.len() != after.len() {
            return Err(Error::SampleParseError(format!("{} / {}", before, after)));
        }

        Ok(Sample {
            before,
            inst: parse_numbered_inst(inst)?,
            after,
        })
    }

    pub fn op_number(&self) -> i64 {
        self.inst.0
    }

    /// Every operation that turns `before` into `after` with this sample's
    /// arguments. Operations that fail on them don't match.
    pub fn matching_ops(&self) -> BTreeSet<OpCode> {
        OpCode::ALL
            .iter()
            .copied()
            .filter(|op| {
                op.apply(&self.inst.1, self.before)
                    .is_ok_and(|regs| regs == self.after)
            })
            .collect()
    }
}

fn parse_registers(text: &str) -> Result<Registers, Error> {
    static REGISTERS_PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\[\s*(-?\d+(?:\s*,\s*-?\d+)*)\s*\]$").unwrap());

    let caps = REGISTERS_PATTERN
        .captures(text.trim())
        .ok_or(Error::SampleParseError(text.to_string()))?;
    let values = caps[1]
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| Error::SampleParseError(text.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Registers::from_slice(&values)
}

pub fn parse_numbered_inst(text: &str) -> Result<NumberedInst, Error> {
    static INST_NUMBER_PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d+) (-?\d+) (-?\d+) (-?\d+)$").unwrap());

    let caps = INST_NUMBER_PATTERN
        .captures(text.trim())
        .ok_or(Error::InstructionFormatError(text.to_string()))?;
    let number = |i: usize| {
        caps[i]
            .parse::<i64>()
            .map_err(|_| Error::InstructionFormatError(text.to_string()))
    };
    Ok((number(1)?, [number(2)?, number(3)?, number(4)?]))
}

/// Number of samples that behave like `threshold` or more operations.
pub fn count_ambiguous(samples: &[Sample], threshold: usize) -> usize {
    samples
        .iter()
        .filter(|s| s.matching_ops().len() >= threshold)
        .count()
}

/// Mapping from operation number to the operation it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpTable {
    ops: HashMap<i64, OpCode>,
}

impl OpTable {
    /// Narrows every number down to the operations all its samples agree on,
    /// then repeatedly settles numbers left with a single candidate and
    /// removes that operation from the others.
    pub fn deduce(samples: &[Sample]) -> Result<Self, Error> {
        let mut candidates: HashMap<i64, BTreeSet<OpCode>> = HashMap::new();
        for sample in samples {
            let matches = sample.matching_ops();
            if let Some(set) = candidates.get_mut(&sample.op_number()) {
                set.retain(|op| matches.contains(op));
            } else {
                candidates.insert(sample.op_number(), matches);
            }
        }

        let mut ops = HashMap::with_capacity(candidates.len());
        while !candidates.is_empty() {
            let settled = candidates
                .iter()
                .filter(|(_, set)| set.len() == 1)
                .filter_map(|(n, set)| set.first().map(|op| (*n, *op)))
                .collect::<Vec<_>>();
            if settled.is_empty() {
                return Err(Error::AmbiguousOpCodes(candidates.len()));
            }

            for (number, op) in settled {
                // two numbers settled on the same operation in one round
                if ops.values().any(|known| *known == op) {
                    return Err(Error::AmbiguousOpCodes(candidates.len()));
                }
                debug!("operation number {} is {}", number, op);
                candidates.remove(&number);
                for set in candidates.values_mut() {
                    set.remove(&op);
                }
                ops.insert(number, op);
            }
        }

        info!("deduced {} operation numbers", ops.len());
        Ok(OpTable { ops })
    }

    pub fn get(&self, number: i64) -> Result<OpCode, Error> {
        self.ops
            .get(&number)
            .copied()
            .ok_or(Error::InvalidOpNumber(number))
    }

    /// Entries sorted by number.
    pub fn entries(&self) -> Vec<(i64, OpCode)> {
        let mut entries = self.ops.iter().map(|(n, op)| (*n, *op)).collect::<Vec<_>>();
        entries.sort();
        entries
    }

    /// Runs a numbered program straight through, one instruction after the
    /// other. No instruction pointer is involved.
    pub fn run(&self, program: &[NumberedInst], mut regs: Registers) -> Result<Registers, Error> {
        for (number, args) in program {
            regs = self.get(*number)?.apply(args, regs)?;
        }

        Ok(regs)
    }
}

/// Contents of a sample file: the samples, then the numbered program.
#[derive(Debug, Clone)]
pub struct SampleFile {
    pub samples: Vec<Sample>,
    pub program: Vec<NumberedInst>,
}

impl SampleFile {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
        let mut samples = Vec::new();
        while let Some(before) = lines.next_if(|l| l.trim_start().starts_with("Before:")) {
            let (Some(inst), Some(after)) = (lines.next(), lines.next()) else {
                return Err(Error::SampleParseError(before.to_string()));
            };
            samples.push(Sample::from_lines(before, inst, after)?);
        }

        let program = lines.map(parse_numbered_inst).collect::<Result<Vec<_>, _>>()?;
        Ok(SampleFile { samples, program })
    }
}
