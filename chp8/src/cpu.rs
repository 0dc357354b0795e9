//! CPU register state.
use crate::{constants::*, error::Fault};

/// Core state for a CHP-8 interpreter.
#[derive(Debug, Clone)]
pub struct Chp8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current instruction in memory.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: u8,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0.
    pub(crate) sound_timer: u8,

    // ------------------------------------------------------------------------
    // Memory
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],

    // ------------------------------------------------------------------------
    // Control
    /// Latched fault. The first fault wins until the CPU is reset.
    pub(crate) fault: Option<Fault>,
}

impl Default for Chp8Cpu {
    fn default() -> Self {
        Self {
            pc: 0,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,

            stack: [0; STACK_SIZE],

            fault: None,
        }
    }
}

impl Chp8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Zero every register, empty the stack and clear the fault latch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline(always)]
    pub fn pc(&self) -> Address {
        self.pc
    }

    #[inline(always)]
    pub fn sp(&self) -> u8 {
        self.sp
    }

    #[inline(always)]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    #[inline(always)]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline(always)]
    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    #[inline(always)]
    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn stack(&self) -> &[Address; STACK_SIZE] {
        &self.stack
    }

    #[inline(always)]
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    #[inline(always)]
    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// Latch a fault, unless one is already set.
    ///
    /// Returns the fault so it can be propagated with `?`.
    pub fn set_fault(&mut self, fault: Fault) -> Fault {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
        fault
    }

    /// Push a return address onto the call stack.
    pub fn push(&mut self, value: Address) -> Result<(), Fault> {
        let sp = self.sp as usize;
        if sp < STACK_SIZE {
            self.stack[sp] = value;
            self.sp += 1;
            Ok(())
        } else {
            Err(self.set_fault(Fault::StackOverflow))
        }
    }

    /// Pop the top return address off the call stack.
    ///
    /// The stack pointer never goes below zero.
    pub fn pop(&mut self) -> Result<Address, Fault> {
        match self.sp.checked_sub(1) {
            Some(sp) => {
                self.sp = sp;
                Ok(self.stack[sp as usize])
            }
            None => Err(self.set_fault(Fault::StackUnderflow)),
        }
    }

    /// Read the top return address without removing it.
    pub fn peek(&mut self) -> Result<Address, Fault> {
        match self.sp as usize {
            0 => Err(self.set_fault(Fault::StackUnderflow)),
            sp if sp > STACK_SIZE => Err(self.set_fault(Fault::StackOverflow)),
            sp => Ok(self.stack[sp - 1]),
        }
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stack_overflow() {
        let mut cpu = Chp8Cpu::new();

        for i in 0..STACK_SIZE as u16 {
            cpu.push(0x200 + i * 2).unwrap();
        }
        assert_eq!(cpu.sp(), 16);
        assert_eq!(cpu.fault(), None);

        let before = *cpu.stack();
        assert_eq!(cpu.push(0xFFF), Err(Fault::StackOverflow));
        assert_eq!(cpu.fault(), Some(Fault::StackOverflow));
        assert_eq!(cpu.sp(), 16);
        assert_eq!(cpu.stack(), &before);
    }

    #[test]
    fn test_stack_order() {
        let mut cpu = Chp8Cpu::new();

        for i in 0..STACK_SIZE as u16 {
            cpu.push(i).unwrap();
        }
        for i in (0..STACK_SIZE as u16).rev() {
            assert_eq!(cpu.peek(), Ok(i));
            assert_eq!(cpu.pop(), Ok(i));
        }

        assert_eq!(cpu.sp(), 0);
        assert_eq!(cpu.fault(), None);
        assert_eq!(cpu.pop(), Err(Fault::StackUnderflow));
        assert_eq!(cpu.fault(), Some(Fault::StackUnderflow));
        assert_eq!(cpu.sp(), 0);
    }

    #[test]
    fn test_peek_empty() {
        let mut cpu = Chp8Cpu::new();
        assert_eq!(cpu.peek(), Err(Fault::StackUnderflow));
        assert!(cpu.has_fault());
    }

    #[test]
    fn test_fault_latch() {
        let mut cpu = Chp8Cpu::new();

        cpu.set_fault(Fault::UnknownOpcode(0x0123));
        let _ = cpu.pop();
        assert_eq!(cpu.fault(), Some(Fault::UnknownOpcode(0x0123)));

        cpu.reset();
        assert_eq!(cpu.fault(), None);
    }

    #[test]
    fn test_timers_stop_at_zero() {
        let mut cpu = Chp8Cpu::new();
        cpu.delay_timer = 1;

        cpu.tick_delay();
        cpu.tick_delay();
        cpu.tick_sound();

        assert_eq!(cpu.delay_timer(), 0);
        assert_eq!(cpu.sound_timer(), 0);
    }
}
