use std::fmt::Display;

use log::debug;

use crate::{Error, Instruction, Registers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The instruction pointer left the program.
    Halted,
    StepLimit,
    /// The instruction pointer reached the breakpoint.
    Break,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Halted => write!(f, "halted"),
            StopReason::StepLimit => write!(f, "reached step limit"),
            StopReason::Break => write!(f, "stopped at breakpoint"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub reason: StopReason,
    pub steps: u64,
}

/// (instruction pointer, registers before the instruction ran)
pub type TraceEntry = (usize, Registers);

#[derive(Debug, Clone)]
pub struct Cpu {
    regs: Registers,
    ip: i64,
    trace: Option<Vec<TraceEntry>>,
    break_at: Option<usize>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Registers::default())
    }
}

impl Cpu {
    pub fn new(regs: Registers) -> Self {
        Cpu {
            regs,
            ip: 0,
            trace: None,
            break_at: None,
        }
    }

    pub fn with_trace(regs: Registers) -> Self {
        Cpu {
            trace: Some(Vec::new()),
            ..Self::new(regs)
        }
    }

    /// Stops `run` before the operation at `ip` executes. An `#ip` line at
    /// that index never triggers it.
    pub fn set_break_at(&mut self, ip: usize) {
        self.break_at = Some(ip);
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn ip(&self) -> i64 {
        self.ip
    }

    /// Recorded steps, `None` when tracing is off.
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    /// Runs `program` from its first instruction.
    ///
    /// The first line must be an `#ip` binding; it is consumed and the pointer
    /// indexes the lines after it. Later bindings switch the mirrored register
    /// and cost no step. Registers carry over from earlier runs, the pointer
    /// doesn't.
    pub fn run(&mut self, program: &[Instruction], max_steps: Option<u64>) -> Result<RunOutcome, Error> {
        let (mut binding, body) = match program.split_first() {
            Some((Instruction::Bind(reg), rest)) => (*reg, rest),
            _ => return Err(Error::MissingIpBinding),
        };

        self.ip = 0;
        let mut steps = 0;
        loop {
            let Some(ind) = usize::try_from(self.ip).ok().filter(|&i| i < body.len()) else {
                return Ok(RunOutcome {
                    reason: StopReason::Halted,
                    steps,
                });
            };
            if max_steps.is_some_and(|max| steps >= max) {
                return Ok(RunOutcome {
                    reason: StopReason::StepLimit,
                    steps,
                });
            }

            let inst = &body[ind];
            let (op, args) = match inst {
                Instruction::Bind(reg) => {
                    binding = *reg;
                    self.ip += 1;
                    continue;
                }
                Instruction::Op { op, args } => (op, args),
            };
            if self.break_at == Some(ind) {
                return Ok(RunOutcome {
                    reason: StopReason::Break,
                    steps,
                });
            }

            self.regs = self.regs.with(binding, self.ip)?;
            if let Some(trace) = self.trace.as_mut() {
                trace.push((ind, self.regs));
            }

            let before = self.regs;
            self.regs = op.apply(args, self.regs)?;
            debug!("ip={} {} {} {}", ind, before, inst, self.regs);

            steps += 1;
            let bound = self.regs.get(binding)?;
            let Some(next) = bound.checked_add(1) else {
                // the next pointer isn't representable, so it's past the end
                self.ip = bound;
                return Ok(RunOutcome {
                    reason: StopReason::Halted,
                    steps,
                });
            };
            self.ip = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_program;

    const STRAIGHT: &str = "#ip 0\nseti 7 0 1\naddi 1 3 2\nmulr 1 2 3";

    // Counts register 0 up to 5, jumping back through the bound register 3.
    const COUNT_TO_FIVE: &str = "#ip 3
seti 0 0 0
addi 0 1 0
gtri 0 4 1
addr 1 3 3
seti 0 0 3";

    #[test]
    fn straight_program_runs_every_instruction_once() {
        let program = parse_program(STRAIGHT).unwrap();
        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Halted, steps: 3 });
        assert_eq!(cpu.ip(), 3);
        assert_eq!(cpu.registers().as_slice(), &[2, 7, 10, 70, 0, 0]);
    }

    #[test]
    fn loop_runs_until_pointer_leaves_program() {
        let program = parse_program(COUNT_TO_FIVE).unwrap();
        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Halted, steps: 20 });
        assert_eq!(cpu.ip(), 5);
        assert_eq!(cpu.registers().as_slice(), &[5, 1, 0, 4, 0, 0]);
    }

    #[test]
    fn step_limit_stops_early() {
        let program = parse_program(COUNT_TO_FIVE).unwrap();
        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, Some(5)).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::StepLimit, steps: 5 });
        // seti, then addi/gtri/addr/seti of the first pass
        assert_eq!(cpu.registers().get(0).unwrap(), 1);
        assert_eq!(cpu.ip(), 1);

        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, Some(0)).unwrap();
        assert_eq!(outcome.steps, 0);
        assert_eq!(cpu.registers(), &Registers::default());
    }

    #[test]
    fn trace_records_state_before_each_step() {
        let program = parse_program(STRAIGHT).unwrap();
        let mut cpu = Cpu::with_trace(Registers::zeroed(4).unwrap());
        cpu.run(&program, None).unwrap();
        let trace = cpu.trace().unwrap();
        assert_eq!(trace.len(), 3);
        let expected: [(usize, [i64; 4]); 3] = [(0, [0, 0, 0, 0]), (1, [1, 7, 0, 0]), (2, [2, 7, 10, 0])];
        for ((ip, regs), (expected_ip, expected_regs)) in trace.iter().zip(expected) {
            assert_eq!(*ip, expected_ip);
            assert_eq!(regs.as_slice(), &expected_regs);
        }
        assert!(Cpu::default().trace().is_none());
    }

    #[test]
    fn missing_binding_fails_before_any_change() {
        let program = parse_program("seti 7 0 1\naddi 1 3 2").unwrap();
        let regs = Registers::from_slice(&[1, 2, 3, 4]).unwrap();
        let mut cpu = Cpu::new(regs);
        assert!(matches!(cpu.run(&program, None), Err(Error::MissingIpBinding)));
        assert!(matches!(cpu.run(&[], None), Err(Error::MissingIpBinding)));
        assert_eq!(cpu.registers(), &regs);
        assert_eq!(cpu.ip(), 0);
    }

    #[test]
    fn binding_in_the_middle_switches_register() {
        let program = parse_program("#ip 0\nseti 9 0 1\n#ip 2\nseti 4 0 3").unwrap();
        let mut cpu = Cpu::with_trace(Registers::zeroed(4).unwrap());
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome.steps, 2);
        assert_eq!(cpu.ip(), 3);
        // register 0 kept the pointer of the first step, register 2 got the second
        assert_eq!(cpu.registers().as_slice(), &[0, 9, 2, 4]);
        assert_eq!(cpu.trace().unwrap().len(), 2);
    }

    #[test]
    fn breakpoint_stops_before_instruction() {
        let program = parse_program(COUNT_TO_FIVE).unwrap();
        let mut cpu = Cpu::default();
        cpu.set_break_at(2);
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Break, steps: 2 });
        assert_eq!(cpu.ip(), 2);
        assert_eq!(cpu.registers().get(0).unwrap(), 1);
        assert_eq!(cpu.registers().get(1).unwrap(), 0);
    }

    #[test]
    fn breakpoint_on_binding_line_never_fires() {
        let program = parse_program("#ip 0\nseti 9 0 1\n#ip 2\nseti 4 0 3").unwrap();
        let mut cpu = Cpu::new(Registers::zeroed(4).unwrap());
        cpu.set_break_at(1);
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Halted, steps: 2 });
    }

    #[test]
    fn initial_registers_change_the_result() {
        let program = parse_program("#ip 1\naddi 0 10 0").unwrap();
        let mut cpu = Cpu::new(Registers::with_prefix(&[1], 6).unwrap());
        cpu.run(&program, None).unwrap();
        assert_eq!(cpu.registers().get(0).unwrap(), 11);
    }

    #[test]
    fn bad_register_aborts_run() {
        let program = parse_program("#ip 0\nseti 1 0 9").unwrap();
        let mut cpu = Cpu::default();
        assert!(matches!(cpu.run(&program, None), Err(Error::InvalidRegisterIndex(9))));

        let program = parse_program("#ip 7\nseti 1 0 1").unwrap();
        assert!(matches!(cpu.run(&program, None), Err(Error::InvalidRegisterIndex(7))));
    }

    #[test]
    fn negative_pointer_halts() {
        let program = parse_program("#ip 0\nseti -5 0 0\nseti 1 0 1").unwrap();
        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Halted, steps: 1 });
        assert_eq!(cpu.ip(), -4);
    }

    #[test]
    fn pointer_past_i64_max_halts() {
        let program = parse_program("#ip 0\nseti 9223372036854775807 0 0\nseti 1 0 1").unwrap();
        let mut cpu = Cpu::default();
        let outcome = cpu.run(&program, None).unwrap();
        assert_eq!(outcome, RunOutcome { reason: StopReason::Halted, steps: 1 });
        assert_eq!(cpu.ip(), i64::MAX);
        assert_eq!(cpu.registers().as_slice(), &[i64::MAX, 0, 0, 0, 0, 0]);
    }
}
