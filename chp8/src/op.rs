//! Instruction decoding.
//!
//! Instruction words are decoded in two levels. The top nibble selects
//! the family, and within some families the remaining bits select the
//! specific operation.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, error::Fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    Jump { address: u16 },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: u16 },
    /// 3xkk (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `kk`
    Skip_Eq_Byte { vx: u8, kk: u8 },
    /// 4xkk (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `kk`.
    Skip_NotEq_Byte { vx: u8, kk: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xkk (LD Vx, byte)
    Load_Byte { vx: u8, kk: u8 },
    /// 7xkk (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, kk: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// VF is set to 1 when the sum overflows 8 bits, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 1 when Vx > Vy (no borrow), else 0.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF receives the bit shifted out. VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// VF is set to 1 when Vy > Vx (no borrow), else 0.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF receives the bit shifted out. VY is unused.
    ShiftLeft { vx: u8 },

    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    Load_Address { address: u16 },
    /// Bnnn (CALL V0, addr)
    ///
    /// Call the sub-routine at `V0 + nnn`.
    Call_V0 { address: u16 },
    /// Cxkk (RND Vx, byte)
    Random { vx: u8, kk: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers, memory and misc
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    Load_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },
}

impl Op {
    /// Decode an instruction word.
    ///
    /// Words that don't map to an operation are an `UnknownOpcode` fault.
    pub fn decode(word: u16) -> Result<Op, Fault> {
        let vx = op_x(word);
        let vy = op_y(word);
        let n = op_n(word);
        let kk = op_kk(word);
        let nnn = op_nnn(word);
        let unknown = Fault::UnknownOpcode(word);

        let op = match op_code(word) {
            0x0 => match nnn {
                0x0E0 => Op::ClearScreen,
                0x0EE => Op::Return,
                _ => return Err(unknown),
            },
            0x1 => Op::Jump { address: nnn },
            0x2 => Op::Call { address: nnn },
            0x3 => Op::Skip_Eq_Byte { vx, kk },
            0x4 => Op::Skip_NotEq_Byte { vx, kk },
            // The low nibble of families 5 and 9 is not checked.
            0x5 => Op::Skip_Eq { vx, vy },
            0x6 => Op::Load_Byte { vx, kk },
            0x7 => Op::Add_Byte { vx, kk },
            // Arithmetic instructions identified by n
            0x8 => match n {
                0x0 => Op::Load_Vx_Vy { vx, vy },
                0x1 => Op::Or_Vx_Vy { vx, vy },
                0x2 => Op::And_Vx_Vy { vx, vy },
                0x3 => Op::Xor_Vx_Vy { vx, vy },
                0x4 => Op::Add_Vx_Vy { vx, vy },
                0x5 => Op::Sub_Vx_Vy { vx, vy },
                0x6 => Op::ShiftRight { vx },
                0x7 => Op::SubReverse_Vx_Vy { vx, vy },
                0xE => Op::ShiftLeft { vx },
                _ => return Err(unknown),
            },
            0x9 => Op::Skip_NotEq { vx, vy },
            0xA => Op::Load_Address { address: nnn },
            0xB => Op::Call_V0 { address: nnn },
            0xC => Op::Random { vx, kk },
            0xD => Op::Draw { vx, vy, n },
            // Keyboard instructions identified by kk
            0xE => match kk {
                0x9E => Op::Skip_Key { vx },
                0xA1 => Op::Skip_NotKey { vx },
                _ => return Err(unknown),
            },
            // Miscellaneous instructions identified by kk
            0xF => match kk {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Load_Vx_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_Address_Vx { vx },
                0x29 => Op::Load_Font { vx },
                0x33 => Op::Load_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => return Err(unknown),
            },
            _ => unreachable!("family is a 4-bit value"),
        };

        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::Jump { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, kk } => write!(f, "SE v{vx:x}, {kk}"),
            Op::Skip_NotEq_Byte { vx, kk } => write!(f, "SNE v{vx:x}, {kk}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx:x}, v{vy:x}"),
            Op::Load_Byte { vx, kk } => write!(f, "LD v{vx:x}, {kk}"),
            Op::Add_Byte { vx, kk } => write!(f, "ADD v{vx:x}, {kk}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:x}, v{vy:x}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:x}, v{vy:x}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:x}, v{vy:x}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:x}, v{vy:x}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:x}, v{vy:x}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:x}, v{vy:x}"),
            Op::ShiftRight { vx } => write!(f, "SHR v{vx:x}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:x}, v{vy:x}"),
            Op::ShiftLeft { vx } => write!(f, "SHL v{vx:x}"),
            // ------
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:x}, v{vy:x}"),
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Call_V0 { address } => write!(f, "CALL v0, 0x{address:03X}"),
            Op::Random { vx, kk } => write!(f, "RND v{vx:x}, {kk}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:x}, v{vy:x}, {n}"),
            // ------
            Op::Skip_Key { vx } => write!(f, "SKP v{vx:x}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP v{vx:x}"),
            // ------
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx:x}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "LD v{vx:x}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:x}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:x}"),
            Op::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:x}"),
            Op::Load_Font { vx } => write!(f, "LD F, v{vx:x}"),
            Op::Load_Bcd { vx } => write!(f, "LD B, v{vx:x}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], v{vx:x}"),
            Op::Load_Registers { vx } => write!(f, "LD v{vx:x}, [I]"),
        }
    }
}
