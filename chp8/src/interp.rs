//! Bytecode interpreter.
use rand::Rng;

use crate::{
    constants::*,
    devices::{Devices, KeyCode},
    error::Fault,
    observer::Observer,
    op::Op,
    vm::{Chp8Vm, Flow},
};

/// Maximum number of rows in a sprite, limited by the 4-bit operand.
const SPRITE_MAX_ROWS: usize = 15;

impl<O: Observer> Chp8Vm<O> {
    /// Execute a single decoded instruction.
    ///
    /// The scheduler advances the program counter by one instruction after
    /// every instruction. Jumps are biased backwards by one instruction, so
    /// the advance lands exactly on their target.
    pub(crate) fn execute(&mut self, op: Op, devices: &impl Devices) -> Result<Flow, Fault> {
        let mut control_flow = Flow::Ok;

        match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.display.clear();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // The popped address is the call instruction itself,
            // so execution resumes just after it.
            Op::Return => {
                self.cpu.pc = self.cpu.pop()?;
                control_flow = Flow::Jump;
            }
            // 1nnn (JP addr)
            Op::Jump { address } => {
                self.jump(address);
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            Op::Call { address } => {
                self.call(address)?;
                control_flow = Flow::Jump;
            }
            // 3xkk (SE Vx, byte)
            Op::Skip_Eq_Byte { vx, kk } => self.skip_if(self.reg(vx) == kk),
            // 4xkk (SNE Vx, byte)
            Op::Skip_NotEq_Byte { vx, kk } => self.skip_if(self.reg(vx) != kk),
            // 5xy0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => self.skip_if(self.reg(vx) == self.reg(vy)),
            // 6xkk (LD Vx, byte)
            Op::Load_Byte { vx, kk } => self.set_reg(vx, kk),
            // 7xkk (ADD Vx, byte)
            Op::Add_Byte { vx, kk } => self.set_reg(vx, self.reg(vx).wrapping_add(kk)),
            // ----------------------------------------------------------------
            // Arithmetic
            Op::Load_Vx_Vy { vx, vy } => self.set_reg(vx, self.reg(vy)),
            Op::Or_Vx_Vy { vx, vy } => self.set_reg(vx, self.reg(vx) | self.reg(vy)),
            Op::And_Vx_Vy { vx, vy } => self.set_reg(vx, self.reg(vx) & self.reg(vy)),
            Op::Xor_Vx_Vy { vx, vy } => self.set_reg(vx, self.reg(vx) ^ self.reg(vy)),
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped. If overflowed, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (result, carry) = self.reg(vx).overflowing_add(self.reg(vy));
                self.set_reg(vx, result);
                self.set_flag(carry);
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (self.reg(vx), self.reg(vy));
                self.set_reg(vx, x.wrapping_sub(y));
                self.set_flag(x > y);
            }
            // 8xy6 (SHR Vx)
            Op::ShiftRight { vx } => {
                let x = self.reg(vx);
                self.set_reg(vx, x >> 1);
                self.set_flag(x & 1 != 0);
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (self.reg(vx), self.reg(vy));
                self.set_reg(vx, y.wrapping_sub(x));
                self.set_flag(y > x);
            }
            // 8xyE (SHL Vx)
            //
            // The most significant bit is shifted out into VF.
            Op::ShiftLeft { vx } => {
                let x = self.reg(vx);
                self.set_reg(vx, x << 1);
                self.set_flag(x & 0x80 != 0);
            }
            // ----------------------------------------------------------------
            // 9xy0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => self.skip_if(self.reg(vx) != self.reg(vy)),
            // Annn (LD I, addr)
            Op::Load_Address { address } => self.cpu.address = address,
            // Bnnn (CALL V0, addr)
            Op::Call_V0 { address } => {
                self.call(address + self.reg(0) as u16)?;
                control_flow = Flow::Jump;
            }
            // Cxkk (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and kk.
            Op::Random { vx, kk } => {
                let value = self.rng.gen::<u8>();
                self.set_reg(vx, value & kk);
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            Op::Draw { vx, vy, n } => {
                let (x, y) = (self.reg(vx) as usize, self.reg(vy) as usize);
                let addr = self.cpu.address as usize;
                let rows = (n as usize).min(SPRITE_MAX_ROWS);

                let mut sprite = [0; SPRITE_MAX_ROWS];
                for (r, row) in sprite.iter_mut().take(rows).enumerate() {
                    *row = self.read_byte(addr + r);
                }

                let is_erased = self.display.draw_sprite(x, y, &sprite[..rows]);
                self.set_flag(is_erased);
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            Op::Skip_Key { vx } => self.skip_if(self.key_pressed(vx, devices)),
            // ExA1 (SKNP Vx)
            Op::Skip_NotKey { vx } => self.skip_if(!self.key_pressed(vx, devices)),
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            Op::Load_Vx_Delay { vx } => self.set_reg(vx, self.cpu.delay_timer),
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            Op::Load_Vx_Key { vx } => match devices.pressed_key() {
                Some(key) => self.set_reg(vx, key.as_u8()),
                None => {
                    // rewind the program counter to stall the machine
                    self.cpu.pc = self.cpu.pc.wrapping_sub(INSTR_SIZE);
                    control_flow = Flow::KeyWait;
                }
            },
            // Fx15 (LD DT, Vx)
            Op::Load_Delay_Vx { vx } => self.cpu.delay_timer = self.reg(vx),
            // Fx18 (LD ST, Vx)
            Op::Load_Sound_Vx { vx } => self.cpu.sound_timer = self.reg(vx),
            // Fx1E (ADD I, Vx)
            Op::Add_Address_Vx { vx } => {
                self.cpu.address = self.cpu.address.wrapping_add(self.reg(vx) as u16);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Font { vx } => {
                let digit = (self.reg(vx) & 0xF) as u16;
                self.cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as u16;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Load_Bcd { vx } => {
                let addr = self.cpu.address as usize;
                let x = self.reg(vx);
                self.write_byte(addr,     x / 100 % 10);
                self.write_byte(addr + 1, x / 10  % 10);
                self.write_byte(addr + 2, x       % 10);
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::Store_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    self.write_byte(addr + v as usize, self.reg(v));
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::Load_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    let value = self.read_byte(addr + v as usize);
                    self.set_reg(v, value);
                }
            }
        }

        Ok(control_flow)
    }

    #[inline(always)]
    fn reg(&self, index: u8) -> u8 {
        self.cpu.registers[index as usize & 0xF]
    }

    #[inline(always)]
    fn set_reg(&mut self, index: u8, value: u8) {
        self.cpu.registers[index as usize & 0xF] = value;
    }

    /// Carry, borrow and collision are reported in VF,
    /// overwriting any result stored there.
    #[inline(always)]
    fn set_flag(&mut self, flag: bool) {
        self.cpu.registers[FLAG_REGISTER] = flag as u8;
    }

    #[inline(always)]
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.cpu.pc = self.cpu.pc.wrapping_add(INSTR_SIZE);
        }
    }

    #[inline(always)]
    fn jump(&mut self, target: Address) {
        self.cpu.pc = target.wrapping_sub(INSTR_SIZE);
    }

    /// Push the address of the call instruction, then jump.
    ///
    /// No jump happens when the stack is full.
    fn call(&mut self, target: Address) -> Result<(), Fault> {
        self.cpu.push(self.cpu.pc)?;
        self.jump(target);
        Ok(())
    }

    fn key_pressed(&self, vx: u8, devices: &impl Devices) -> bool {
        KeyCode::try_from(self.reg(vx))
            .map(|key| devices.is_pressed(key))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{devices::Headless, observer::EventLog, vm::Chp8Conf};

    fn vm_with(program: &[u8]) -> Chp8Vm<EventLog> {
        let conf = Chp8Conf {
            seed: Some(8),
            ..Default::default()
        };
        let mut vm = Chp8Vm::with_observer(conf, EventLog::new()).unwrap();
        vm.load_bytecode(program).unwrap();
        vm
    }

    fn run_steps(vm: &mut Chp8Vm<EventLog>, count: usize) {
        let dev = Headless::new();
        for _ in 0..count {
            vm.step(&dev).unwrap();
        }
    }

    #[test]
    fn test_add_carry() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 250,  // LD v0, 250
            0x61, 10,   // LD v1, 10
            0x80, 0x14, // ADD v0, v1
            0x62, 10,   // LD v2, 10
            0x63, 250,  // LD v3, 250
            0x82, 0x34, // ADD v2, v3
        ]);

        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 4);
        assert_eq!(vm.cpu.registers[0xF], 1);

        // Operand order doesn't matter.
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[2], 4);
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_add_no_carry() {
        let mut vm = vm_with(&[0x60, 0xFE, 0x61, 0x01, 0x80, 0x14]);
        vm.cpu.registers[0xF] = 1;
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 0xFF);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_sub_borrow() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 5,    // LD v0, 5
            0x61, 10,   // LD v1, 10
            0x80, 0x15, // SUB v0, v1
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 251);
        assert_eq!(vm.cpu.registers[0xF], 0);

        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 10,   // LD v0, 10
            0x61, 5,    // LD v1, 5
            0x80, 0x15, // SUB v0, v1
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 5);
        assert_eq!(vm.cpu.registers[0xF], 1);

        // Equal operands borrow nothing, but are not "greater than".
        let mut vm = vm_with(&[0x60, 7, 0x61, 7, 0x80, 0x15]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 0);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_subn() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 5,    // LD v0, 5
            0x61, 10,   // LD v1, 10
            0x80, 0x17, // SUBN v0, v1
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 5);
        assert_eq!(vm.cpu.registers[0xF], 1);

        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 10,   // LD v0, 10
            0x61, 4,    // LD v1, 4
            0x80, 0x17, // SUBN v0, v1
            0x62, 9,    // LD v2, 9
            0x63, 9,    // LD v3, 9
            0x82, 0x37, // SUBN v2, v3
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0], 250);
        assert_eq!(vm.cpu.registers[0xF], 0);

        // Equal operands don't set the flag.
        vm.cpu.registers[0xF] = 1;
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[2], 0);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_shifts() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0b1000_0001, // LD v0, 0x81
            0x80, 0x06,        // SHR v0
            0x61, 0b1000_0001, // LD v1, 0x81
            0x81, 0x0E,        // SHL v1
            0x62, 0b0100_0000, // LD v2, 0x40
            0x82, 0x0E,        // SHL v2
        ]);

        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.registers[0], 0b0100_0000);
        assert_eq!(vm.cpu.registers[0xF], 1);

        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.registers[1], 0b0000_0010);
        assert_eq!(vm.cpu.registers[0xF], 1);

        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.registers[2], 0b1000_0000);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_shift_right_even() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0b0000_0110, // LD v0, 6
            0x80, 0x06,        // SHR v0
        ]);
        vm.cpu.registers[0xF] = 1;
        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.registers[0], 0b0000_0011);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_flag_overwrites_result() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x6F, 200,  // LD vF, 200
            0x60, 100,  // LD v0, 100
            0x8F, 0x04, // ADD vF, v0
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_logic() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0b1100, // LD v0
            0x61, 0b1010, // LD v1
            0x82, 0x00,   // LD v2, v0
            0x82, 0x11,   // OR v2, v1
            0x83, 0x00,   // LD v3, v0
            0x83, 0x12,   // AND v3, v1
            0x84, 0x00,   // LD v4, v0
            0x84, 0x13,   // XOR v4, v1
            0x75, 0xFF,   // ADD v5, 0xFF
            0x75, 0x02,   // ADD v5, 2
        ]);
        run_steps(&mut vm, 10);
        assert_eq!(vm.cpu.registers[2], 0b1110);
        assert_eq!(vm.cpu.registers[3], 0b1000);
        assert_eq!(vm.cpu.registers[4], 0b0110);
        // Immediate add wraps, and leaves the flag alone.
        assert_eq!(vm.cpu.registers[5], 1);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_skips() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x05, // 200: LD v0, 5
            0x30, 0x05, // 202: SE v0, 5     ; skips
            0x00, 0x00, // 204: invalid
            0x40, 0x05, // 206: SNE v0, 5    ; no skip
            0x61, 0x05, // 208: LD v1, 5
            0x50, 0x10, // 20A: SE v0, v1    ; skips
            0x00, 0x00, // 20C: invalid
            0x90, 0x10, // 20E: SNE v0, v1   ; no skip
            0x62, 0x01, // 210: LD v2, 1
        ]);

        run_steps(&mut vm, 7);
        assert_eq!(vm.cpu.pc, 0x212);
        assert_eq!(vm.cpu.registers[2], 1);
        assert_eq!(vm.cpu.fault, None);
    }

    #[test]
    fn test_jump_bias() {
        let mut vm = vm_with(&[0x12, 0x34]);
        run_steps(&mut vm, 1);
        assert_eq!(vm.cpu.pc, 0x0234);
    }

    #[test]
    fn test_call_return() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x22, 0x06, // 200: CALL 0x206
            0x61, 0x01, // 202: LD v1, 1
            0x00, 0x00, // 204: padding
            0x60, 0x2A, // 206: LD v0, 42
            0x00, 0xEE, // 208: RET
        ]);

        run_steps(&mut vm, 1);
        assert_eq!(vm.cpu.pc, 0x206);
        assert_eq!(vm.cpu.sp, 1);
        assert_eq!(vm.cpu.stack[0], 0x200);

        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.pc, 0x202);
        assert_eq!(vm.cpu.sp, 0);

        run_steps(&mut vm, 1);
        assert_eq!(vm.cpu.registers[0], 42);
        assert_eq!(vm.cpu.registers[1], 1);
    }

    #[test]
    fn test_call_v0() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x04, // 200: LD v0, 4
            0xB2, 0x04, // 202: CALL v0, 0x204
        ]);
        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.pc, 0x208);
        assert_eq!(vm.cpu.sp, 1);
        assert_eq!(vm.cpu.stack[0], 0x202);
    }

    #[test]
    fn test_call_overflow_does_not_jump() {
        // Calls itself forever.
        let mut vm = vm_with(&[0x22, 0x00]);
        let dev = Headless::new();

        for _ in 0..STACK_SIZE {
            assert_eq!(vm.step(&dev), Ok(Flow::Jump));
        }
        assert_eq!(vm.step(&dev), Err(Fault::StackOverflow));
        assert_eq!(vm.cpu.pc, 0x200);
        assert_eq!(vm.cpu.sp, STACK_SIZE as u8);
        assert!(vm.cpu.stack.iter().all(|addr| *addr == 0x200));
    }

    #[test]
    fn test_unknown_opcode() {
        let mut vm = vm_with(&[0x80, 0x0F]);
        let dev = Headless::new();

        assert_eq!(vm.step(&dev), Err(Fault::UnknownOpcode(0x800F)));
        assert_eq!(vm.cpu.fault, Some(Fault::UnknownOpcode(0x800F)));

        // Latched, nothing else is executed.
        assert_eq!(vm.step(&dev), Err(Fault::UnknownOpcode(0x800F)));
        assert_eq!(vm.cpu.pc, 0x200);
    }

    #[test]
    fn test_random_mask() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xC0, 0x0F, // RND v0, 0x0F
            0xC1, 0x00, // RND v1, 0
        ]);
        run_steps(&mut vm, 2);
        assert_eq!(vm.cpu.registers[0] & 0xF0, 0);
        assert_eq!(vm.cpu.registers[1], 0);
    }

    #[test]
    fn test_draw_collision() {
        // Draw two pixels next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // draw sprite 1
        // ____####, vf == 0
        //
        // draw sprite 2
        // ########, vf == 0
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xA2, 0x10, // 200: LD I, 0x210
            0x60, 0x04, // 202: LD v0, 4
            0x61, 0x00, // 204: LD v1, 0
            0xD0, 0x11, // 206: DRW v0, v1, 1
            0x60, 0x00, // 208: LD v0, 0
            0xD0, 0x11, // 20A: DRW v0, v1, 1
            0xD0, 0x11, // 20C: DRW v0, v1, 1
            0x00, 0x00, // 20E: padding
            0b1111_0000, 0b0000_0000,
        ]);

        run_steps(&mut vm, 6);
        assert!((0..8).all(|x| vm.display.pixel(x, 0) == Ok(true)));
        assert_eq!(vm.cpu.registers[0xF], 0);

        // Drawing again erases, which is a collision.
        run_steps(&mut vm, 1);
        assert_eq!(vm.display.pixel(0, 0), Ok(false));
        assert_eq!(vm.display.pixel(4, 0), Ok(true));
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_draw_font() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x0A, // LD v0, 0xA
            0xF0, 0x29, // LD F, v0
            0x61, 0x3E, // LD v1, 62
            0xD1, 0x15, // DRW v1, v1, 5
        ]);
        run_steps(&mut vm, 4);

        assert_eq!(vm.cpu.address, FONTSET_START + 0xA * 5);
        // Top row of "A" is 0xF0, wrapped around the right edge.
        assert_eq!(vm.display.pixel(62, 62 % 32), Ok(true));
        assert_eq!(vm.display.pixel(63, 62 % 32), Ok(true));
        assert_eq!(vm.display.pixel(0, 62 % 32), Ok(true));
        assert_eq!(vm.display.pixel(1, 62 % 32), Ok(true));
        assert_eq!(vm.display.pixel(2, 62 % 32), Ok(false));
    }

    #[test]
    fn test_bcd() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 254,  // LD v0, 254
            0xA3, 0x00, // LD I, 0x300
            0xF0, 0x33, // LD B, v0
        ]);
        run_steps(&mut vm, 3);
        assert_eq!(&vm.memory.as_slice()[0x300..0x303], &[2, 5, 4]);
    }

    #[test]
    fn test_store_load_registers() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x11, // LD v0, 0x11
            0x61, 0x22, // LD v1, 0x22
            0x62, 0x33, // LD v2, 0x33
            0xA3, 0x00, // LD I, 0x300
            0xF1, 0x55, // LD [I], v1
            0x60, 0x00, // LD v0, 0
            0x61, 0x00, // LD v1, 0
            0xF2, 0x65, // LD v2, [I]
        ]);
        run_steps(&mut vm, 8);

        assert_eq!(&vm.memory.as_slice()[0x300..0x303], &[0x11, 0x22, 0x00]);
        assert_eq!(&vm.cpu.registers[0..3], &[0x11, 0x22, 0x00]);
        assert_eq!(vm.cpu.address, 0x300);
    }

    #[test]
    fn test_store_out_of_bounds() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xAF, 0xFE, // LD I, 0xFFE
            0xF3, 0x55, // LD [I], v3
        ]);
        run_steps(&mut vm, 2);

        // Two writes fit, two are reported. Execution continues.
        assert_eq!(vm.observer.out_of_bounds().count(), 2);
        assert_eq!(vm.cpu.fault, None);
        assert_eq!(vm.cpu.pc, 0x204);
    }

    #[test]
    fn test_timer_registers() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x20, // LD v0, 0x20
            0xF0, 0x15, // LD DT, v0
            0xF0, 0x18, // LD ST, v0
            0xF1, 0x07, // LD v1, DT
            0xF0, 0x1E, // ADD I, v0
        ]);
        run_steps(&mut vm, 5);
        assert_eq!(vm.cpu.delay_timer, 0x20);
        assert_eq!(vm.cpu.sound_timer, 0x20);
        assert_eq!(vm.cpu.registers[1], 0x20);
        assert_eq!(vm.cpu.address, 0x20);
    }

    #[test]
    fn test_skip_key() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x07, // 200: LD v0, 7
            0xE0, 0x9E, // 202: SKP v0     ; skips
            0x00, 0x00, // 204: invalid
            0xE0, 0xA1, // 206: SKNP v0    ; no skip
            0x61, 0x10, // 208: LD v1, 16
            0xE1, 0x9E, // 20A: SKP v1     ; not a key, no skip
        ]);
        let mut dev = Headless::new();
        dev.set_key(KeyCode::Key7, true);

        for _ in 0..5 {
            vm.step(&dev).unwrap();
        }
        assert_eq!(vm.cpu.pc, 0x20C);
    }

    #[test]
    fn test_skip_not_key() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x07, // 200: LD v0, 7
            0xE0, 0xA1, // 202: SKNP v0    ; released, skips
            0x00, 0x00, // 204: invalid
            0xE0, 0x9E, // 206: SKP v0     ; released, no skip
            0x61, 0x01, // 208: LD v1, 1
        ]);
        let mut dev = Headless::new();
        dev.set_key(KeyCode::Key3, true);

        for _ in 0..4 {
            vm.step(&dev).unwrap();
        }
        assert_eq!(vm.cpu.pc, 0x20A);
        assert_eq!(vm.cpu.registers[1], 1);
    }

    #[test]
    fn test_skip_register_ignores_low_nibble() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x50, 0x11, // 200: SE v0, v1    ; both zero, skips
            0x00, 0x00, // 202: invalid
            0x60, 0x01, // 204: LD v0, 1
            0x90, 0x1F, // 206: SNE v0, v1   ; differ, skips
            0x00, 0x00, // 208: invalid
            0x62, 0x01, // 20A: LD v2, 1
        ]);
        let dev = Headless::new();

        assert_eq!(vm.step(&dev), Ok(Flow::Ok));
        assert_eq!(vm.cpu.pc, 0x204);

        run_steps(&mut vm, 3);
        assert_eq!(vm.cpu.pc, 0x20C);
        assert_eq!(vm.cpu.registers[2], 1);
        assert_eq!(vm.cpu.fault, None);
    }
}
