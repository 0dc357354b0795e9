//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    bytecode::instr_word,
    clock::Clock,
    constants::*,
    cpu::Chp8Cpu,
    devices::Devices,
    display::{Framebuffer, VideoMode},
    error::{Chp8Error, Chp8Result, Fault},
    memory::Memory,
    observer::{Event, LogObserver, Observer},
    op::Op,
    selftest::InversionPattern,
};

pub struct Chp8Vm<O = LogObserver> {
    pub(crate) cpu: Chp8Cpu,
    pub(crate) memory: Memory,
    pub(crate) display: Framebuffer,
    pub(crate) rng: StdRng,
    pub(crate) observer: O,
    /// Instruction clock.
    clock: Clock,
    /// Delay and sound timer clock.
    timer: Clock,
    self_test: Option<InversionPattern>,
    instructions_this_tick: usize,
    display_open: bool,
    conf: Chp8Conf,
}

/// Control flow outcome of a single instruction.
///
/// The scheduler only acts on `KeyWait`. The other variants are
/// informational, for callers that drive the machine with `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - Bnnn (`CALL V0, addr`)
    /// - 00EE (`RET`)
    Jump,
    /// The framebuffer was written to, by `CLS` or `DRW`.
    Draw,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Chp8Conf {
    /// Instructions executed per second. Defaults to 100.
    pub clock_frequency: Option<Hz>,
    /// Size of main memory in bytes.
    pub memory_size: usize,
    /// Address where programs are loaded, and where execution starts.
    pub load_address: Address,
    pub video_mode: VideoMode,
    /// Run the display inversion pattern instead of the program.
    pub self_test: bool,
    /// Seed for the random number generator. Random when not set.
    pub seed: Option<u64>,
}

impl Default for Chp8Conf {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            memory_size: MEM_SIZE,
            load_address: MEM_START as Address,
            video_mode: VideoMode::default(),
            self_test: false,
            seed: None,
        }
    }
}

impl Chp8Conf {
    /// Wall clock time that one instruction takes.
    pub fn instruction_period(&self) -> Chp8Result<Duration> {
        let freq = self.clock_frequency.unwrap_or(Hz(CLOCK_FREQUENCY));
        if freq.0 == 0 || freq.0 > NANOS_IN_SECOND {
            return Err(Chp8Error::Config(
                "clock frequency must be between 1Hz and 1GHz",
            ));
        }
        Ok(freq.into())
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Read-only snapshot of the machine, for diagnostics.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub pc: Address,
    pub sp: u8,
    pub registers: [u8; REGISTER_COUNT],
    pub address: Address,
    pub stack: [Address; STACK_SIZE],
    pub delay_timer: u8,
    pub sound_timer: u8,
    /// Time accumulated towards the next instruction.
    pub accumulated: Duration,
    pub instructions_this_tick: usize,
    pub fault: Option<Fault>,
}

impl Chp8Vm<LogObserver> {
    pub fn new(conf: Chp8Conf) -> Chp8Result<Self> {
        Self::with_observer(conf, LogObserver)
    }
}

impl<O: Observer> Chp8Vm<O> {
    /// Create a machine that reports to the given observer.
    ///
    /// Fails when the configuration is invalid or memory can't be allocated.
    /// A machine that failed construction never exists, so it can never be ticked.
    pub fn with_observer(conf: Chp8Conf, observer: O) -> Chp8Result<Self> {
        let period = conf.instruction_period()?;
        if !conf.video_mode.is_valid() {
            return Err(Chp8Error::Config("video mode must be between 1 and 65536 pixels"));
        }
        let memory = Memory::new(conf.memory_size)?;

        if conf.load_address as usize >= memory.len() {
            return Err(Chp8Error::Config("load address must be inside memory"));
        }

        let rng = match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut vm = Self {
            cpu: Chp8Cpu::new(),
            memory,
            display: Framebuffer::new(conf.video_mode),
            rng,
            observer,
            clock: Clock::new(period),
            timer: Clock::from_frequency(DELAY_FREQUENCY),
            self_test: None,
            instructions_this_tick: 0,
            display_open: true,
            conf,
        };

        vm.load_font();
        vm.reset();

        Ok(vm)
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chp8Conf {
        &self.conf
    }

    pub fn cpu(&self) -> &Chp8Cpu {
        &self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Framebuffer {
        &mut self.display
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The latched fault, if the machine has halted.
    pub fn fault(&self) -> Option<Fault> {
        self.cpu.fault
    }

    /// The machine is active until it faults, or its display is closed.
    pub fn is_active(&self) -> bool {
        !self.cpu.has_fault() && self.display_open
    }

    /// Change the resolution of the framebuffer. The screen is cleared.
    ///
    /// An invalid mode is rejected and the framebuffer is left as is.
    pub fn set_video_mode(&mut self, mode: VideoMode) -> Chp8Result<()> {
        if !mode.is_valid() {
            return Err(Chp8Error::Config("video mode must be between 1 and 65536 pixels"));
        }
        self.display.set_mode(mode);
        self.observer.on_event(&Event::ModeChange(mode));
        Ok(())
    }

    /// Install the builtin hexadecimal font.
    fn load_font(&mut self) {
        if let Err(err) = self.memory.load(FONTSET_START as usize, &FONTSET) {
            self.observer.on_event(&Event::OutOfBounds(err));
        }
    }

    /// Replace the contents of memory with the given program.
    ///
    /// The machine is reset, ready to execute from the load address.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chp8Result<()> {
        let start = self.conf.load_address as usize;
        if start + bytecode.len() > self.memory.len() {
            return Err(Chp8Error::LargeProgram);
        }

        // Start with clean memory to avoid leaking previous program.
        self.memory.fill(0);

        // Reset fonts
        self.load_font();

        // Load program into virtual RAM
        self.memory
            .load(start, bytecode)
            .map_err(|_| Chp8Error::LargeProgram)?;

        self.reset();

        Ok(())
    }

    /// Clear internal state in preparation for a fresh startup.
    ///
    /// Memory is left as is, so the loaded program can be run again.
    /// This also clears a latched fault.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.pc = self.conf.load_address;
        self.display.clear();
        self.clock.reset();
        self.timer.reset();
        self.instructions_this_tick = 0;
        self.self_test = if self.conf.self_test {
            Some(InversionPattern::new())
        } else {
            None
        };
    }

    /// Read a byte from memory.
    ///
    /// Access out of bounds is reported, and reads as zero.
    pub fn read_byte(&mut self, addr: usize) -> u8 {
        match self.memory.read(addr) {
            Ok(value) => value,
            Err(err) => {
                self.observer.on_event(&Event::OutOfBounds(err));
                0
            }
        }
    }

    /// Write a byte to memory.
    ///
    /// Access out of bounds is reported, and the write is dropped.
    pub fn write_byte(&mut self, addr: usize, value: u8) -> bool {
        match self.memory.write(addr, value) {
            Ok(()) => true,
            Err(err) => {
                self.observer.on_event(&Event::OutOfBounds(err));
                false
            }
        }
    }
}

/// Scheduler
impl<O: Observer> Chp8Vm<O> {
    /// Advance the machine by the wall time elapsed since the previous tick.
    ///
    /// Runs as many instructions as fit in the elapsed time, counts down the
    /// timers, and hands the framebuffer to the devices when it changed.
    ///
    /// A fault is returned as an error once, from the tick that hit it.
    /// Later ticks execute nothing, but the display keeps being presented.
    ///
    /// Returns the number of instructions executed.
    pub fn tick(&mut self, delta: Duration, devices: &mut impl Devices) -> Chp8Result<usize> {
        self.instructions_this_tick = 0;

        let result = self.run(delta, &*devices);
        self.present(devices);

        result.map(|_| self.instructions_this_tick)
    }

    fn run(&mut self, delta: Duration, devices: &impl Devices) -> Chp8Result<()> {
        if self.cpu.has_fault() {
            return Ok(());
        }

        if let Some(pattern) = self.self_test.as_mut() {
            if let Err(err) = pattern.advance(delta, &mut self.display) {
                self.observer.on_event(&Event::OutOfBounds(err));
            }
            return Ok(());
        }

        // Count down timers
        self.timer.advance(delta);
        while self.timer.tick() {
            self.cpu.tick_sound();
            self.cpu.tick_delay();
        }

        self.clock.advance(delta);
        while self.clock.tick() {
            self.instructions_this_tick += 1;

            if self.step(devices)? == Flow::KeyWait {
                // Idle until the next tick, rather than catching up
                // on all the time spent waiting.
                self.clock.reset();
                break;
            }
        }

        Ok(())
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// The program counter is advanced past the instruction, except when
    /// it faults. A machine with a latched fault executes nothing.
    pub fn step(&mut self, devices: &impl Devices) -> Result<Flow, Fault> {
        if let Some(fault) = self.cpu.fault {
            return Err(fault);
        }

        let pc = self.cpu.pc;

        // Each instruction is two bytes, high byte first.
        let word = instr_word([
            self.read_byte(pc as usize),
            self.read_byte(pc as usize + 1),
        ]);

        let result = match Op::decode(word) {
            Ok(op) => {
                self.observer.on_event(&Event::Exec { pc, op });
                self.execute(op, devices)
            }
            Err(fault) => Err(fault),
        };

        match result {
            Ok(flow) => {
                if flow == Flow::KeyWait {
                    self.observer.on_event(&Event::KeyWait { pc });
                }
                self.cpu.pc = self.cpu.pc.wrapping_add(INSTR_SIZE);
                Ok(flow)
            }
            Err(fault) => {
                self.cpu.set_fault(fault);
                self.observer.on_event(&Event::Fault { pc, fault });
                Err(fault)
            }
        }
    }

    fn present(&mut self, devices: &mut impl Devices) {
        if !devices.is_open() {
            if self.display_open {
                self.display_open = false;
                self.observer.on_event(&Event::Closed);
            }
            return;
        }

        self.display_open = true;

        if self.display.take_changed() {
            devices.draw(&self.display);
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            registers: self.cpu.registers,
            address: self.cpu.address,
            stack: self.cpu.stack,
            delay_timer: self.cpu.delay_timer,
            sound_timer: self.cpu.sound_timer,
            accumulated: self.clock.accumulated(),
            instructions_this_tick: self.instructions_this_tick,
            fault: self.cpu.fault,
        }
    }
}

/// Troubleshooting
impl<O: Observer> Chp8Vm<O> {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let ram = self.memory.as_slice();
        let iter = ram
            .iter()
            .enumerate()
            .skip(self.conf.load_address as usize)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let operand = ram.get(i + 1).copied().unwrap_or(0);
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, operand)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for row in self.display.rows() {
            for px in row {
                if *px {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    /// Registers, timers and the top of the stack.
    pub fn dump_state(&self) -> Result<String, fmt::Error> {
        let t = self.telemetry();
        let mut buf = String::new();

        writeln!(
            buf,
            "accum = {:.4}s, instructions this tick: {}",
            t.accumulated.as_secs_f32(),
            t.instructions_this_tick
        )?;

        for (i, chunk) in t.registers.chunks(4).enumerate() {
            for (j, value) in chunk.iter().enumerate() {
                write!(buf, "V{:X}: {:02X}  ", i * 4 + j, value)?;
            }
            writeln!(buf)?;
        }

        writeln!(buf, "SD: {:02X}  DL: {:02X}", t.sound_timer, t.delay_timer)?;
        writeln!(buf, "PC: {:04X}  I: {:04X}  SP: {:X}", t.pc, t.address, t.sp)?;

        for i in (0..t.sp as usize).rev().take(5) {
            writeln!(buf, "stack[{:X}] = {:04X}", i, t.stack[i])?;
        }

        if let Some(fault) = t.fault {
            writeln!(buf, "fault: {fault}")?;
        }

        Ok(buf)
    }
}
