use core::convert::TryFrom;

use bitvec::prelude::*;
use heapless::{consts::U30, Vec};
use log::{trace, warn};

use crate::context::Context;
use crate::error::Error;
use crate::frame::{Frame, FrameView, HEIGHT, WIDTH};
use crate::opcode::OpCode;
#[cfg(feature = "atomic")]
use crate::timer::atomic::Timer;
#[cfg(not(feature = "atomic"))]
use crate::timer::racy::Timer;
use crate::timer::TimerState;

pub(crate) const MEM_SIZE: usize = 0x10000;
/// Architecturally meaningful address space; I-indexed accesses stay inside.
const ADDR_SPACE: u16 = 0x1000;
const PROG_START: u16 = 0x200;
const GLYPH_LEN: u16 = 5;

/// Built-in 5-byte glyph sprites for the digits 0-F, installed at 0x000.
#[rustfmt::skip]
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The machine: registers, memory, call stack, timers and framebuffer,
/// driven one instruction at a time through [`tick_chip`](Multi8::tick_chip).
pub struct Multi8<C: Context + Sized> {
    ctx: C,
    v: [u8; 16],
    i: u16,
    pc: u16,
    frame: Frame,
    memory: [u8; MEM_SIZE],
    stack: Vec<u16, U30>,
    delay_timer: Timer,
    sound_timer: Timer,
}

impl<C: Context + Sized> Multi8<C> {
    pub fn new(ctx: C) -> Self {
        let mut memory = [0; MEM_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);
        Self {
            ctx,
            v: [0; 16],
            i: 0,
            pc: PROG_START,
            frame: Frame::new(),
            memory,
            stack: Vec::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
        }
    }

    /// Build a machine and load a program in one go.
    pub fn load(ctx: C, prog: &[u8]) -> Result<Self, Error> {
        let mut chip = Self::new(ctx);
        chip.load_program(prog)?;
        Ok(chip)
    }

    /// Copy a program image to memory starting at 0x200 (_start address)
    pub fn load_program(&mut self, prog: &[u8]) -> Result<(), Error> {
        let origin = PROG_START as usize;
        if prog.len() > MEM_SIZE - origin {
            return Err(Error::ProgramTooLarge { len: prog.len() });
        }
        self.memory[origin..origin + prog.len()].copy_from_slice(prog);
        Ok(())
    }

    /// Read a program image from `reader` and load it.
    ///
    /// Read failures are propagated; nothing is copied to memory unless the
    /// whole image was read and fits.
    #[cfg(feature = "std")]
    pub fn load_from<R: std::io::Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<(), crate::error::LoadError> {
        let mut image = std::vec::Vec::new();
        reader.read_to_end(&mut image)?;
        self.load_program(&image)?;
        Ok(())
    }

    /// Return every piece of state to the power-on configuration, keeping
    /// the allocation and the context.
    pub fn reset(&mut self) {
        self.v = [0; 16];
        self.i = 0;
        self.pc = PROG_START;
        self.stack.clear();
        self.delay_timer.store(0);
        self.sound_timer.store(0);
        self.frame.clear();
        for byte in self.memory.iter_mut() {
            *byte = 0;
        }
        self.memory[..FONT.len()].copy_from_slice(&FONT);
    }

    /// Read-only view of the current display contents.
    pub fn frame(&self) -> FrameView<'_> {
        self.frame.view()
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Execute exactly one fetch-decode-execute cycle.
    ///
    /// Returns `nb::Error::WouldBlock` while suspended on the wait-for-key
    /// instruction; ticking again retries it. Any other error aborts the
    /// step without further state mutation.
    pub fn tick_chip(&mut self) -> nb::Result<(), Error> {
        let at = self.pc;
        let raw = self.fetch().map_err(nb::Error::Other)?;
        trace!("pc: {:#06X}, opcode: {:#06X}", at, raw);
        match OpCode::try_from(raw) {
            Ok(opcode) => self.execute(opcode)?,
            Err(raw) => warn!("unknown encoding {:#06X} at {:#06X}, skipping", raw, at),
        }
        self.ctx.on_frame(self.frame.view());
        Ok(())
    }

    /// Decrement both timers once; the driver clocks this at 60 Hz,
    /// independently of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.delay_timer.decrement();
        match self.sound_timer.decrement() {
            TimerState::On => self.ctx.sound_on(),
            TimerState::Finished => self.ctx.sound_off(),
            TimerState::Off => {}
        }
    }

    /// Read the big-endian instruction word at pc and advance pc past it.
    fn fetch(&mut self) -> Result<u16, Error> {
        let pc = self.pc as usize;
        if pc >= MEM_SIZE - 1 {
            return Err(Error::OutOfBounds { addr: self.pc });
        }
        let raw = (self.memory[pc] as u16) << 8 | self.memory[pc + 1] as u16;
        self.pc_increment()?;
        Ok(raw)
    }

    fn pc_increment(&mut self) -> Result<(), Error> {
        if (self.pc as usize) < MEM_SIZE - 2 {
            self.pc += 2;
            Ok(())
        } else {
            Err(Error::OutOfBounds { addr: self.pc })
        }
    }

    /// Memory range `[I, I + len)` must stay inside the 4 KiB space.
    fn check_i_range(&self, len: u16) -> Result<(), Error> {
        if len == 0 || self.i as usize + len as usize <= ADDR_SPACE as usize {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                addr: self.i.max(ADDR_SPACE),
            })
        }
    }
}

// OpCodes impls
impl<C: Context + Sized> Multi8<C> {
    #[rustfmt::skip]
    fn execute(&mut self, opcode: OpCode) -> nb::Result<(), Error> {
        match opcode {
            OpCode::_0NNN { nnn }     => self.exec_ml_subroutine_at(nnn),
            OpCode::_00E0             => self.clear_screen(),
            OpCode::_00EE             => self.subroutine_return(),
            OpCode::_1NNN { nnn }     => self.jump_to(nnn),
            OpCode::_2NNN { nnn }     => self.exec_subroutine_at(nnn),
            OpCode::_3XNN { x, nn }   => self.skip_if_vx_eq_nn(x, nn),
            OpCode::_4XNN { x, nn }   => self.skip_if_vx_ne_nn(x, nn),
            OpCode::_5XY0 { x, y }    => self.skip_if_vx_eq_vy(x, y),
            OpCode::_6XNN { x, nn }   => self.assign_vx_nn(x, nn),
            OpCode::_7XNN { x, nn }   => self.assign_add_vx_nn(x, nn),
            OpCode::_8XY0 { x, y }    => self.assign_vx_vy(x, y),
            OpCode::_8XY1 { x, y }    => self.assign_or_vx_vy(x, y),
            OpCode::_8XY2 { x, y }    => self.assign_and_vx_vy(x, y),
            OpCode::_8XY3 { x, y }    => self.assign_xor_vx_vy(x, y),
            OpCode::_8XY4 { x, y }    => self.assign_add_vx_vy(x, y),
            OpCode::_8XY5 { x, y }    => self.assign_sub_vx_vy(x, y),
            OpCode::_8XY6 { x, .. }   => self.assign_vx_shifted_r(x),
            OpCode::_8XY7 { x, y }    => self.assign_vx_vy_sub_vx(x, y),
            OpCode::_8XYE { x, .. }   => self.assign_vx_shifted_l(x),
            OpCode::_9XY0 { x, y }    => self.skip_if_vx_ne_vy(x, y),
            OpCode::_ANNN { nnn }     => self.assign_i_nnn(nnn),
            OpCode::_BNNN { nnn }     => self.jump_to_nnn_add_v0(nnn),
            OpCode::_CXNN { x, nn }   => self.assign_vx_random_and_nn(x, nn),
            OpCode::_DXYN { x, y, n } => self.draw_n_at_vx_vy(x, y, n),
            OpCode::_EX9E { x }       => self.skip_if_vx_in_keys(x),
            OpCode::_EXA1 { x }       => self.skip_if_vx_not_in_keys(x),
            OpCode::_FX07 { x }       => self.assign_vx_delay_t(x),
            OpCode::_FX0A { x }       => return self.assign_vx_wait_for_key(x),
            OpCode::_FX15 { x }       => self.assign_delay_t_vx(x),
            OpCode::_FX18 { x }       => self.assign_sound_t_vx(x),
            OpCode::_FX1E { x }       => self.assign_add_i_vx(x),
            OpCode::_FX29 { x }       => self.assign_i_addr_of_sprite_vx(x),
            OpCode::_FX33 { x }       => self.assign_mem_at_i_bcd_of_vx(x),
            OpCode::_FX55 { x }       => self.assign_mem_at_i_v0_to_vx(x),
            OpCode::_FX65 { x }       => self.assign_v0_to_vx_mem_at_i(x),
        }
        .map_err(nb::Error::Other)
    }

    /// Execute machine language subroutine at address NNN
    ///
    /// Host-machine code does not exist here; the instruction is ignored.
    fn exec_ml_subroutine_at(&mut self, _nnn: u16) -> Result<(), Error> {
        Ok(())
    }

    /// Clear the screen
    fn clear_screen(&mut self) -> Result<(), Error> {
        self.frame.clear();
        Ok(())
    }

    /// Return from a subroutine
    fn subroutine_return(&mut self) -> Result<(), Error> {
        self.stack
            .pop()
            .ok_or(Error::StackUnderflow)
            .map(|addr| self.pc = addr)
    }

    /// Jump to address NNN
    fn jump_to(&mut self, nnn: u16) -> Result<(), Error> {
        self.pc = nnn;
        Ok(())
    }

    /// Execute subroutine starting at address NNN
    fn exec_subroutine_at(&mut self, nnn: u16) -> Result<(), Error> {
        self.stack
            .push(self.pc)
            .or(Err(Error::StackOverflow))
            .map(|_| self.pc = nnn)
    }

    /// Skip the following instruction if VX equals NN
    fn skip_if_vx_eq_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] == nn {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Skip the following instruction if VX is not equal to NN
    fn skip_if_vx_ne_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] != nn {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Skip the following instruction if VX is equal to VY
    fn skip_if_vx_eq_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] == self.v[y as usize] {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Store number NN in register VX
    fn assign_vx_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = nn;
        Ok(())
    }

    /// Add the value NN to register VX, carry flag untouched
    fn assign_add_vx_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[x as usize].wrapping_add(nn);
        Ok(())
    }

    /// Store the value of register VY in register VX
    fn assign_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX OR VY
    fn assign_or_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] |= self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX AND VY
    fn assign_and_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] &= self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX XOR VY
    fn assign_xor_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] ^= self.v[y as usize];
        Ok(())
    }

    /// Add VY to VX, VF = 1 iff the unsigned sum exceeds 255
    fn assign_add_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, overflow) = self.v[x as usize].overflowing_add(self.v[y as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = overflow as u8;
        Ok(())
    }

    /// Subtract VY from VX, VF = 1 iff VX was strictly greater than VY
    ///
    /// Strict: VX == VY leaves VF at 0.
    fn assign_sub_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
        self.v[x as usize] = vx.wrapping_sub(vy);
        self.v[0xF] = (vx > vy) as u8;
        Ok(())
    }

    /// Shift VX right by one, VF = least significant bit before the shift
    fn assign_vx_shifted_r(&mut self, x: u8) -> Result<(), Error> {
        let vx = self.v[x as usize];
        self.v[x as usize] = vx >> 1;
        self.v[0xF] = vx & 1;
        Ok(())
    }

    /// Set VX to VY minus VX, VF = 1 iff VY was strictly greater than VX
    fn assign_vx_vy_sub_vx(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
        self.v[x as usize] = vy.wrapping_sub(vx);
        self.v[0xF] = (vy > vx) as u8;
        Ok(())
    }

    /// Shift VX left by one, VF = most significant bit before the shift
    fn assign_vx_shifted_l(&mut self, x: u8) -> Result<(), Error> {
        let vx = self.v[x as usize];
        self.v[x as usize] = vx << 1;
        self.v[0xF] = vx >> 7;
        Ok(())
    }

    /// Skip the following instruction if VX is not equal to VY
    fn skip_if_vx_ne_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] != self.v[y as usize] {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Store memory address NNN in register I
    fn assign_i_nnn(&mut self, nnn: u16) -> Result<(), Error> {
        self.i = nnn;
        Ok(())
    }

    /// Jump to address NNN + V0
    fn jump_to_nnn_add_v0(&mut self, nnn: u16) -> Result<(), Error> {
        self.pc = nnn + self.v[0] as u16;
        Ok(())
    }

    /// Set VX to a random number with a mask of NN
    fn assign_vx_random_and_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.ctx.gen_random() & nn;
        Ok(())
    }

    /// Draw an 8xN sprite from address I at (VX, VY), VF = collision
    ///
    /// Coordinates wrap toroidally. The sprite's memory range is validated
    /// up front, so a failing draw leaves the framebuffer untouched.
    fn draw_n_at_vx_vy(&mut self, x: u8, y: u8, n: u8) -> Result<(), Error> {
        self.check_i_range(n as u16)?;
        let base = self.i as usize;
        let (origin_x, origin_y) = (self.v[x as usize] as usize, self.v[y as usize] as usize);
        self.v[0xF] = 0;
        for (row, byte) in self.memory[base..base + n as usize].iter().enumerate() {
            for (col, bit) in byte.view_bits::<Msb0>().iter().enumerate() {
                if !*bit {
                    continue;
                }
                let (tx, ty) = ((origin_x + col) % WIDTH, (origin_y + row) % HEIGHT);
                match self.frame.flip(tx, ty) {
                    // a set pixel went dark under XOR
                    Some(false) => self.v[0xF] = 1,
                    Some(true) => {}
                    None => {
                        return Err(Error::OutOfBounds {
                            addr: (ty * WIDTH + tx) as u16,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Skip the following instruction if the key with value VX is pressed
    fn skip_if_vx_in_keys(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0x0F) as usize;
        if self.ctx.get_keys()[key] {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Skip the following instruction if the key with value VX is not pressed
    fn skip_if_vx_not_in_keys(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0x0F) as usize;
        if !self.ctx.get_keys()[key] {
            self.pc_increment()
        } else {
            Ok(())
        }
    }

    /// Store the current value of the delay timer in register VX
    fn assign_vx_delay_t(&mut self, x: u8) -> Result<(), Error> {
        self.v[x as usize] = self.delay_timer.load();
        Ok(())
    }

    /// Wait for a keypress and store its value in register VX
    ///
    /// Suspends the execution cycle only: pc is rewound to this instruction
    /// and the caller gets `WouldBlock` until a key is observed.
    fn assign_vx_wait_for_key(&mut self, x: u8) -> nb::Result<(), Error> {
        match self.ctx.get_keys().iter().position(|&k| k) {
            Some(key) => {
                self.v[x as usize] = key as u8;
                Ok(())
            }
            None => {
                self.pc -= 2;
                Err(nb::Error::WouldBlock)
            }
        }
    }

    /// Set the delay timer to the value of register VX
    fn assign_delay_t_vx(&mut self, x: u8) -> Result<(), Error> {
        self.delay_timer.store(self.v[x as usize]);
        Ok(())
    }

    /// Set the sound timer to the value of register VX
    fn assign_sound_t_vx(&mut self, x: u8) -> Result<(), Error> {
        self.sound_timer.store(self.v[x as usize]);
        Ok(())
    }

    /// Add the value of register VX to register I, no overflow flag
    fn assign_add_i_vx(&mut self, x: u8) -> Result<(), Error> {
        self.i = self.i.wrapping_add(self.v[x as usize] as u16);
        Ok(())
    }

    /// Set I to the address of the built-in glyph for the digit in VX
    fn assign_i_addr_of_sprite_vx(&mut self, x: u8) -> Result<(), Error> {
        self.i = self.v[x as usize] as u16 * GLYPH_LEN;
        Ok(())
    }

    /// Store the binary-coded decimal of VX at addresses I, I+1, I+2
    fn assign_mem_at_i_bcd_of_vx(&mut self, x: u8) -> Result<(), Error> {
        self.check_i_range(3)?;
        let addr = self.i as usize;
        let value = self.v[x as usize];
        self.memory[addr] = value / 100;
        self.memory[addr + 1] = (value / 10) % 10;
        self.memory[addr + 2] = (value % 100) % 10;
        Ok(())
    }

    /// Store registers V0 to VX inclusive in memory starting at address I
    ///
    /// I itself is left unchanged.
    fn assign_mem_at_i_v0_to_vx(&mut self, x: u8) -> Result<(), Error> {
        self.check_i_range(x as u16 + 1)?;
        let base = self.i as usize;
        for idx in 0..=x as usize {
            self.memory[base + idx] = self.v[idx];
        }
        Ok(())
    }

    /// Fill registers V0 to VX inclusive from memory starting at address I
    ///
    /// I itself is left unchanged.
    fn assign_v0_to_vx_mem_at_i(&mut self, x: u8) -> Result<(), Error> {
        self.check_i_range(x as u16 + 1)?;
        let base = self.i as usize;
        for idx in 0..=x as usize {
            self.v[idx] = self.memory[base + idx];
        }
        Ok(())
    }
}
