mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod display;
mod error;
mod interp;
mod memory;
mod observer;
mod op;
mod selftest;
mod vm;

pub use self::vm::Hz;

/// Version of this interpreter implementation.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chp8Cpu,
        devices::{Devices, Headless, InvalidKeyCode, KeyCode},
        disasm::Disassembler,
        display::{Framebuffer, VideoMode},
        error::{Chp8Error, Chp8Result, Fault, OutOfBounds},
        memory::Memory,
        observer::{Event, EventLog, LogObserver, Observer},
        op::Op,
        selftest::{InversionPattern, Phase},
        vm::{Chp8Conf, Chp8Vm, Flow, Hz, Telemetry},
    };
}
