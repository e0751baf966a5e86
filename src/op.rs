use std::fmt::Display;

use crate::{Error, Registers};

pub type Args = [i64; 3];

/// The sixteen operations of the CPU. Declaration order gives each one its
/// number, which the sample decoder iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    AddR,
    AddI,
    MulR,
    MulI,
    BanR,
    BanI,
    BorR,
    BorI,
    SetR,
    SetI,
    GtIR,
    GtRI,
    GtRR,
    EqIR,
    EqRI,
    EqRR,
}

impl TryFrom<&str> for OpCode {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.name() == value)
            .ok_or_else(|| Error::UnknownOpCode(value.to_string()))
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl OpCode {
    pub const ALL: [OpCode; 16] = [
        OpCode::AddR,
        OpCode::AddI,
        OpCode::MulR,
        OpCode::MulI,
        OpCode::BanR,
        OpCode::BanI,
        OpCode::BorR,
        OpCode::BorI,
        OpCode::SetR,
        OpCode::SetI,
        OpCode::GtIR,
        OpCode::GtRI,
        OpCode::GtRR,
        OpCode::EqIR,
        OpCode::EqRI,
        OpCode::EqRR,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OpCode::AddR => "addr",
            OpCode::AddI => "addi",
            OpCode::MulR => "mulr",
            OpCode::MulI => "muli",
            OpCode::BanR => "banr",
            OpCode::BanI => "bani",
            OpCode::BorR => "borr",
            OpCode::BorI => "bori",
            OpCode::SetR => "setr",
            OpCode::SetI => "seti",
            OpCode::GtIR => "gtir",
            OpCode::GtRI => "gtri",
            OpCode::GtRR => "gtrr",
            OpCode::EqIR => "eqir",
            OpCode::EqRI => "eqri",
            OpCode::EqRR => "eqrr",
        }
    }

    /// Applies this operation to `regs` and returns the register file with
    /// register C updated. Nothing else changes.
    pub fn apply(self, args: &Args, regs: Registers) -> Result<Registers, Error> {
        let [a, b, c] = *args;
        let value = match self {
            OpCode::AddR => self.checked(regs.get(a)?, regs.get(b)?, i64::checked_add)?,
            OpCode::AddI => self.checked(regs.get(a)?, b, i64::checked_add)?,
            OpCode::MulR => self.checked(regs.get(a)?, regs.get(b)?, i64::checked_mul)?,
            OpCode::MulI => self.checked(regs.get(a)?, b, i64::checked_mul)?,
            OpCode::BanR => regs.get(a)? & regs.get(b)?,
            OpCode::BanI => regs.get(a)? & b,
            OpCode::BorR => regs.get(a)? | regs.get(b)?,
            OpCode::BorI => regs.get(a)? | b,
            OpCode::SetR => regs.get(a)?,
            OpCode::SetI => a,
            OpCode::GtIR => i64::from(a > regs.get(b)?),
            OpCode::GtRI => i64::from(regs.get(a)? > b),
            OpCode::GtRR => i64::from(regs.get(a)? > regs.get(b)?),
            OpCode::EqIR => i64::from(a == regs.get(b)?),
            OpCode::EqRI => i64::from(regs.get(a)? == b),
            OpCode::EqRR => i64::from(regs.get(a)? == regs.get(b)?),
        };

        regs.with(c, value)
    }

    fn checked(self, lhs: i64, rhs: i64, f: fn(i64, i64) -> Option<i64>) -> Result<i64, Error> {
        f(lhs, rhs).ok_or(Error::ArithmeticOverflow(self, lhs, rhs))
    }
}

#[test]
fn test_operations() {
    let cases: [(OpCode, Args, [i64; 4]); 16] = [
        (OpCode::AddR, [0, 1, 3], [3, 5, 7, 8]),
        (OpCode::AddI, [3, 2, 1], [3, 13, 7, 11]),
        (OpCode::MulR, [0, 1, 3], [3, 5, 7, 15]),
        (OpCode::MulI, [3, 2, 1], [3, 22, 7, 11]),
        (OpCode::BanR, [0, 1, 3], [3, 5, 7, 1]),
        (OpCode::BanI, [3, 2, 1], [3, 2, 7, 11]),
        (OpCode::BorR, [0, 1, 3], [3, 5, 7, 7]),
        (OpCode::BorI, [3, 2, 1], [3, 11, 7, 11]),
        (OpCode::SetR, [0, 1, 3], [3, 5, 7, 3]),
        (OpCode::SetI, [3, 2, 1], [3, 3, 7, 11]),
        (OpCode::GtIR, [0, 1, 3], [3, 5, 7, 0]),
        (OpCode::GtRI, [3, 1, 2], [3, 5, 1, 11]),
        (OpCode::GtRR, [2, 1, 0], [1, 5, 7, 11]),
        (OpCode::EqIR, [0, 1, 3], [3, 5, 7, 0]),
        (OpCode::EqRI, [3, 11, 2], [3, 5, 1, 11]),
        (OpCode::EqRR, [2, 1, 0], [0, 5, 7, 11]),
    ];
    let regs = Registers::from_slice(&[3, 5, 7, 11]).unwrap();
    for (op, args, expected) in cases {
        let after = op.apply(&args, regs).unwrap();
        assert_eq!(after.as_slice(), &expected, "{} {:?}", op, args);
    }
    assert_eq!(regs.as_slice(), &[3, 5, 7, 11]);
}

#[test]
fn test_names_resolve_to_every_op() {
    for op in OpCode::ALL {
        assert_eq!(OpCode::try_from(op.name()).unwrap(), op);
    }
    assert!(matches!(
        OpCode::try_from("divr"),
        Err(Error::UnknownOpCode(s)) if s == "divr"
    ));
}

#[test]
fn test_overflow_is_reported() {
    let regs = Registers::from_slice(&[i64::MAX, 2]).unwrap();
    assert!(matches!(
        OpCode::AddI.apply(&[0, 1, 1], regs),
        Err(Error::ArithmeticOverflow(OpCode::AddI, i64::MAX, 1))
    ));
    assert!(matches!(
        OpCode::MulR.apply(&[0, 1, 0], regs),
        Err(Error::ArithmeticOverflow(OpCode::MulR, _, 2))
    ));
    let big = OpCode::MulI.apply(&[1, 1 << 40, 0], regs).unwrap();
    assert_eq!(big.get(0).unwrap(), 1 << 41);
}

#[test]
fn test_register_out_of_range() {
    let regs = Registers::from_slice(&[3, 5, 7, 11]).unwrap();
    assert!(matches!(
        OpCode::SetI.apply(&[1, 0, 4], regs),
        Err(Error::InvalidRegisterIndex(4))
    ));
    assert!(matches!(
        OpCode::AddR.apply(&[-1, 0, 0], regs),
        Err(Error::InvalidRegisterIndex(-1))
    ));
}
