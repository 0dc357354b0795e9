//! Helpers for extracting operands from instruction words.
//!
//! An instruction is a big-endian 16-bit word. The top nibble is the
//! family, and the remaining bits are laid out as:
//!
//! ```text
//! F X Y N
//!   N N N   nnn: 12-bit address
//!     K K   kk:  8-bit immediate
//! ```

/// Join two bytes into an instruction word, high byte first.
#[inline(always)]
pub fn instr_word(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Extract the family nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand X, the register index in bits 8-11.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand Y, the register index in bits 4-7.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N, the lowest nibble.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Extract operand KK, the low byte.
#[inline(always)]
pub fn op_kk(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand NNN, the low 12 bits.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}
