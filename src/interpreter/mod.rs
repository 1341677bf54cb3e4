mod error;
mod font;
mod instruction;
mod stack;

use chip8_base::{Display, Interpreter, Keys, Pixel};
use error::Chip8Error;
use instruction::{Instruction, Opcode};
use log::{debug, error, info, log_enabled, trace, warn, Level};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stack::CallStack;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;

const MEMORY_SIZE: usize = 4096;
const PROGRAM_START: u16 = 0x200;
const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
const DISPLAY_WIDTH: usize = 64;
const DISPLAY_HEIGHT: usize = 32;
const TIMER_FREQ: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    /// Fx0A is suspended until a key is down; the key index goes into `register`.
    AwaitingKey { register: u8 },
}

/// What one cycle did, as far as the host loop cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Continue,
    /// The display changed and should be presented.
    Redraw,
    AwaitingKey,
}

pub struct ChipState {
    memory: [u8; MEMORY_SIZE],
    program_counter: u16,
    stack: CallStack,
    registers: [u8; 16],
    index_register: u16,
    delay_timer: u8,
    sound_timer: u8,
    keypad: Keys,
    display: Display,
    run_state: RunState,
    rng: StdRng,
    ticker: u32,
    max_ticks: u32,
    clock_speed: Duration,
}

impl Interpreter for ChipState {
    fn step(&mut self, keys: &Keys) -> Option<Display> {
        self.set_keys(keys);
        let update = match self.cycle() {
            Ok(Cycle::Redraw) => Some(self.display),
            Ok(_) => None,
            Err(e) if !e.is_fatal() => {
                warn!("{}, skipped", e);
                None
            }
            Err(e) => {
                error!("{}\n{}", e, self);
                std::process::exit(1);
            }
        };

        // Timers run at 60Hz whatever the clock speed
        self.ticker += 1;
        if self.ticker >= self.max_ticks {
            self.ticker = 0;
            self.tick_timers();
        }
        update
    }

    fn speed(&self) -> Duration {
        self.clock_speed
    }

    fn buzzer_active(&self) -> bool {
        self.sound_active()
    }
}

impl ChipState {
    /// A fresh machine running `clock_freq` instructions per second, with the
    /// random generator seeded from the OS.
    pub fn new(clock_freq: u32) -> Self {
        Self::with_rng(clock_freq, StdRng::from_entropy())
    }

    /// Like `new`, but `Cxkk` produces the same sequence on every run.
    pub fn with_seed(clock_freq: u32, seed: u64) -> Self {
        Self::with_rng(clock_freq, StdRng::seed_from_u64(seed))
    }

    fn with_rng(clock_freq: u32, rng: StdRng) -> Self {
        let clock_freq = clock_freq.max(1);
        let mut memory = [0_u8; MEMORY_SIZE];
        let font_start = font::FONT_BASE as usize;
        memory[font_start..font_start + font::FONT.len()].copy_from_slice(&font::FONT);

        ChipState {
            memory,
            program_counter: PROGRAM_START,
            stack: CallStack::default(),
            registers: [0; 16],
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            display: [[Pixel::Black; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            run_state: RunState::Running,
            rng,
            ticker: 0,
            max_ticks: ((clock_freq as f64 / TIMER_FREQ).round() as u32).max(1),
            clock_speed: Duration::from_secs_f64(1_f64 / clock_freq as f64),
        }
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, Chip8Error> {
        let path = path.as_ref();
        let program = std::fs::read(path).map_err(|source| Chip8Error::RomRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_program(&program)?;
        info!("loaded {} ({} bytes)", path.display(), program.len());
        Ok(self)
    }

    /// Copies `program` to 0x200. Programs that don't fit are rejected whole.
    pub fn load_program(&mut self, program: &[u8]) -> Result<&mut Self, Chip8Error> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.memory[start..start + program.len()].copy_from_slice(program);
        self.program_counter = PROGRAM_START;
        Ok(self)
    }

    pub fn set_keys(&mut self, keys: &Keys) {
        self.keypad = *keys;
    }

    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    /// One 60Hz tick of the delay and sound timers.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        if self.sound_timer > 0 {
            self.sound_timer -= 1;
            if self.sound_timer == 0 {
                debug!("sound timer expired, tone off");
            }
        }
    }

    /// Runs one fetch-decode-execute cycle. While waiting on `Fx0A` nothing is
    /// fetched; the keypad is checked instead.
    pub fn cycle(&mut self) -> Result<Cycle, Chip8Error> {
        if let RunState::AwaitingKey { register } = self.run_state {
            return Ok(self.poll_key(register));
        }

        let address = self.program_counter;
        let opcode = self.fetch()?;
        let instruction = Instruction::try_from(opcode)?;
        trace!("{:#05X}: {:04X} {:?}", address, opcode.0, instruction);
        let cycle = self.execute(instruction)?;
        if log_enabled!(Level::Trace) {
            trace!("\n{}", self);
        }
        Ok(cycle)
    }

    fn fetch(&mut self) -> Result<Opcode, Chip8Error> {
        let pc = self.program_counter as usize;
        match self.memory.get(pc..pc + 2) {
            Some(&[high, low]) => {
                self.program_counter += 2;
                Ok(Opcode::from_bytes(high, low))
            }
            _ => Err(Chip8Error::ProgramCounterOutOfBounds {
                address: self.program_counter,
            }),
        }
    }

    fn register(&self, index: u8) -> u8 {
        self.registers[index as usize]
    }

    fn register_mut(&mut self, index: u8) -> &mut u8 {
        &mut self.registers[index as usize]
    }

    fn set_flag(&mut self, flag: bool) {
        self.registers[0xF] = flag as u8;
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter += 2;
        }
    }

    /// `len` bytes of memory starting at I.
    fn index_range(&self, len: usize) -> Result<Range<usize>, Chip8Error> {
        let start = self.index_register as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: MEMORY_SIZE,
            });
        }
        Ok(start..end)
    }

    fn pressed_key(&self) -> Option<u8> {
        self.keypad.iter().position(|&down| down).map(|key| key as u8)
    }

    fn poll_key(&mut self, register: u8) -> Cycle {
        match self.pressed_key() {
            Some(key) => {
                *self.register_mut(register) = key;
                self.run_state = RunState::Running;
                debug!("key {:X} pressed, resuming", key);
                Cycle::Continue
            }
            None => Cycle::AwaitingKey,
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Cycle, Chip8Error> {
        use Instruction::*;

        match instruction {
            ClearScreen => {
                self.display = [[Pixel::Black; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
                return Ok(Cycle::Redraw);
            }
            Return => {
                self.program_counter = self.stack.pop()?;
                debug!("return to {:#05X}", self.program_counter);
            }
            Jump { addr } => self.program_counter = addr,
            Call { addr } => {
                self.stack.push(self.program_counter)?;
                debug!("call {:#05X} from {:#05X}", addr, self.program_counter - 2);
                self.program_counter = addr;
            }
            SkipIfEqualImm { x, kk } => self.skip_if(self.register(x) == kk),
            SkipIfNotEqualImm { x, kk } => self.skip_if(self.register(x) != kk),
            SkipIfEqual { x, y } => self.skip_if(self.register(x) == self.register(y)),
            SkipIfNotEqual { x, y } => self.skip_if(self.register(x) != self.register(y)),
            LoadImm { x, kk } => *self.register_mut(x) = kk,
            // no carry flag, unlike 8xy4
            AddImm { x, kk } => *self.register_mut(x) = self.register(x).wrapping_add(kk),
            Move { x, y } => *self.register_mut(x) = self.register(y),
            Or { x, y } => *self.register_mut(x) |= self.register(y),
            And { x, y } => *self.register_mut(x) &= self.register(y),
            Xor { x, y } => *self.register_mut(x) ^= self.register(y),
            // VF is written before Vx, so with x = F the result wins over the flag
            Add { x, y } => {
                let (sum, carry) = self.register(x).overflowing_add(self.register(y));
                self.set_flag(carry);
                *self.register_mut(x) = sum;
            }
            Sub { x, y } => {
                let (vx, vy) = (self.register(x), self.register(y));
                self.set_flag(vx > vy);
                *self.register_mut(x) = vx.wrapping_sub(vy);
            }
            ShiftRight { x } => {
                let vx = self.register(x);
                self.set_flag(vx & 0x1 == 1);
                *self.register_mut(x) = vx >> 1;
            }
            SubReverse { x, y } => {
                let (vx, vy) = (self.register(x), self.register(y));
                self.set_flag(vy > vx);
                *self.register_mut(x) = vy.wrapping_sub(vx);
            }
            ShiftLeft { x } => {
                let vx = self.register(x);
                self.set_flag(vx >> 7 == 1);
                *self.register_mut(x) = vx << 1;
            }
            SetIndex { addr } => self.index_register = addr,
            JumpPlusV0 { addr } => {
                self.program_counter = (addr + self.register(0x0) as u16) & 0xFFF;
            }
            Random { x, kk } => *self.register_mut(x) = self.rng.gen::<u8>() & kk,
            Draw { x, y, n } => {
                let sprite = self.index_range(n as usize)?;
                let origin_x = self.register(x) as usize;
                let origin_y = self.register(y) as usize;
                let mut collision = false;

                for (row, bits) in self.memory[sprite].iter().enumerate() {
                    let pix_y = (origin_y + row) % DISPLAY_HEIGHT;
                    for col in 0..8 {
                        if bits & (0x80 >> col) == 0 {
                            continue;
                        }
                        let pixel = &mut self.display[pix_y][(origin_x + col) % DISPLAY_WIDTH];
                        if *pixel == Pixel::White {
                            collision = true;
                            *pixel = Pixel::Black;
                        } else {
                            *pixel = Pixel::White;
                        }
                    }
                }
                self.set_flag(collision);
                return Ok(Cycle::Redraw);
            }
            SkipIfKey { x } => self.skip_if(self.keypad[(self.register(x) & 0xF) as usize]),
            SkipIfNotKey { x } => self.skip_if(!self.keypad[(self.register(x) & 0xF) as usize]),
            GetDelay { x } => *self.register_mut(x) = self.delay_timer,
            WaitKey { x } => {
                self.run_state = RunState::AwaitingKey { register: x };
                debug!("waiting for key into V{:X}", x);
                return Ok(self.poll_key(x));
            }
            SetDelay { x } => self.delay_timer = self.register(x),
            SetSound { x } => self.sound_timer = self.register(x),
            AddIndex { x } => {
                let sum = self.index_register + self.register(x) as u16;
                self.index_register = sum & 0xFFF;
                self.set_flag(sum > 0xFFF);
            }
            FontAddress { x } => self.index_register = font::glyph_address(self.register(x)),
            StoreBcd { x } => {
                let digits = self.index_range(3)?;
                let value = self.register(x);
                self.memory[digits].copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
            }
            DumpRegisters { x } => {
                let count = x as usize + 1;
                let dest = self.index_range(count)?;
                self.memory[dest].copy_from_slice(&self.registers[..count]);
            }
            LoadRegisters { x } => {
                let count = x as usize + 1;
                let src = self.index_range(count)?;
                self.registers[..count].copy_from_slice(&self.memory[src]);
            }
        };
        Ok(Cycle::Continue)
    }
}

/// Register dump, one line per group of four.
impl fmt::Display for ChipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..4 {
            for col in 0..4 {
                let reg = row + col * 4;
                write!(f, "V{:X}: {:#04x}  ", reg, self.registers[reg])?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "PC: {:#06x}  I: {:#06x}  SP: {}  DT: {}  ST: {}",
            self.program_counter,
            self.index_register,
            self.stack.depth(),
            self.delay_timer,
            self.sound_timer
        )
    }
}
