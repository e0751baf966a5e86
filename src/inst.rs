use std::fmt::Display;

use crate::{
    op::{Args, OpCode},
    Error,
};

const IP_BINDING_NAME: &str = "#ip";

/// One line of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `#ip N`: register N mirrors the instruction pointer from here on.
    Bind(i64),
    Op { op: OpCode, args: Args },
}

impl TryFrom<&str> for Instruction {
    type Error = Error;

    /// Parses one line. The result must render back to exactly the same text,
    /// otherwise the line is rejected.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let format_err = || Error::InstructionFormatError(value.to_string());
        let mut tokens = value.split_whitespace();
        let name = tokens.next().ok_or_else(format_err)?;
        let numbers = tokens
            .map(|s| s.parse::<i64>().map_err(|_| format_err()))
            .collect::<Result<Vec<_>, _>>()?;

        let inst = if name.starts_with('#') {
            match numbers[..] {
                [reg] => Instruction::Bind(reg),
                _ => return Err(format_err()),
            }
        } else {
            let op = OpCode::try_from(name)?;
            match numbers[..] {
                [a, b, c] => Instruction::Op { op, args: [a, b, c] },
                _ => return Err(format_err()),
            }
        };

        if inst.to_string() != value {
            return Err(Error::RoundTripError(value.to_string()));
        }

        Ok(inst)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Bind(reg) => write!(f, "{} {}", IP_BINDING_NAME, reg),
            Instruction::Op { op, args } => {
                write!(f, "{} {} {} {}", op, args[0], args[1], args[2])
            }
        }
    }
}

#[test]
fn test_parse_round_trip() {
    for line in ["#ip 0", "#ip 4", "seti 5 0 1", "addi -3 12 2", "eqrr 2 1 0", "gtir 15 3 5"] {
        let inst = Instruction::try_from(line).unwrap();
        assert_eq!(inst.to_string(), line);
    }
}

#[test]
fn test_parse_values() {
    assert_eq!(Instruction::try_from("#ip 3").unwrap(), Instruction::Bind(3));
    assert_eq!(
        Instruction::try_from("mulr 1 2 3").unwrap(),
        Instruction::Op {
            op: OpCode::MulR,
            args: [1, 2, 3]
        }
    );
}

#[test]
fn test_parse_rejects_non_canonical_text() {
    for line in ["seti  5 0 1", "seti 5 0 1 ", " seti 5 0 1", "seti +5 0 1", "seti 05 0 1", "#foo 1"] {
        assert!(
            matches!(Instruction::try_from(line), Err(Error::RoundTripError(_))),
            "{:?}",
            line
        );
    }
}

#[test]
fn test_parse_rejects_malformed_text() {
    for line in ["", "seti 5 0", "seti 5 0 1 2", "seti a 0 1", "#ip", "#ip 1 2"] {
        assert!(
            matches!(Instruction::try_from(line), Err(Error::InstructionFormatError(_))),
            "{:?}",
            line
        );
    }
    assert!(matches!(
        Instruction::try_from("jmpr 1 2 3"),
        Err(Error::UnknownOpCode(_))
    ));
}
