//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::instr_word, constants::*, op::Op};

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    /// Address the bytecode is loaded at, for display.
    origin: usize,
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self::with_origin(bytecode, MEM_START)
    }

    pub fn with_origin(bytecode: &'a [u8], origin: usize) -> Self {
        Self {
            bytecode,
            origin,
            cursor: 0,
        }
    }

    /// Render the whole program, one instruction per line.
    pub fn disassemble_all(&mut self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble(&mut s)?;
            self.cursor += INSTR_SIZE as usize;
        }
        self.cursor = 0;

        Ok(s)
    }

    /// Write a single instruction to the given writer.
    ///
    /// Words that don't decode are likely sprite data, and are written as
    /// a raw data directive.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let addr = self.origin + self.cursor;

        // Odd trailing byte.
        if self.cursor + 1 >= self.bytecode.len() {
            let byte = self.bytecode.get(self.cursor).copied().unwrap_or(0);
            return writeln!(w, "{addr:04X}: {byte:02X}   DB 0x{byte:02X}");
        }

        let word = instr_word([self.bytecode[self.cursor], self.bytecode[self.cursor + 1]]);
        match Op::decode(word) {
            Ok(op) => writeln!(w, "{addr:04X}: {word:04X} {op}"),
            Err(_) => writeln!(w, "{addr:04X}: {word:04X} DW 0x{word:04X}"),
        }
    }
}
