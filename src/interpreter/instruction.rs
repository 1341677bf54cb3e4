use super::error::Chip8Error;

/// Raw 16-bit instruction word and its conventional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn from_bytes(high: u8, low: u8) -> Self {
        Opcode(u16::from_be_bytes([high, low]))
    }

    /// Top nibble, selects the instruction group.
    pub fn category(self) -> u8 {
        (self.0 >> 12) as u8
    }

    pub fn x(self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    pub fn y(self) -> u8 {
        ((self.0 >> 4) & 0xF) as u8
    }

    pub fn n(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    pub fn kk(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn nnn(self) -> u16 {
        self.0 & 0xFFF
    }
}

/// Every instruction the interpreter understands. Register operands are
/// indices `0x0..=0xF`, addresses are 12 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1nnn
    Jump { addr: u16 },
    /// 2nnn
    Call { addr: u16 },
    /// 3xkk
    SkipIfEqualImm { x: u8, kk: u8 },
    /// 4xkk
    SkipIfNotEqualImm { x: u8, kk: u8 },
    /// 5xy0
    SkipIfEqual { x: u8, y: u8 },
    /// 6xkk
    LoadImm { x: u8, kk: u8 },
    /// 7xkk
    AddImm { x: u8, kk: u8 },
    /// 8xy0
    Move { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4
    Add { x: u8, y: u8 },
    /// 8xy5
    Sub { x: u8, y: u8 },
    /// 8xy6
    ShiftRight { x: u8 },
    /// 8xy7
    SubReverse { x: u8, y: u8 },
    /// 8xyE
    ShiftLeft { x: u8 },
    /// 9xy0
    SkipIfNotEqual { x: u8, y: u8 },
    /// Annn
    SetIndex { addr: u16 },
    /// Bnnn
    JumpPlusV0 { addr: u16 },
    /// Cxkk
    Random { x: u8, kk: u8 },
    /// Dxyn
    Draw { x: u8, y: u8, n: u8 },
    /// Ex9E
    SkipIfKey { x: u8 },
    /// ExA1
    SkipIfNotKey { x: u8 },
    /// Fx07
    GetDelay { x: u8 },
    /// Fx0A
    WaitKey { x: u8 },
    /// Fx15
    SetDelay { x: u8 },
    /// Fx18
    SetSound { x: u8 },
    /// Fx1E
    AddIndex { x: u8 },
    /// Fx29
    FontAddress { x: u8 },
    /// Fx33
    StoreBcd { x: u8 },
    /// Fx55
    DumpRegisters { x: u8 },
    /// Fx65
    LoadRegisters { x: u8 },
}

impl TryFrom<Opcode> for Instruction {
    type Error = Chip8Error;

    /// Dispatches on the top nibble, then on `kk` (groups 0, E, F) or `n`
    /// (group 8) where one nibble is not enough.
    fn try_from(op: Opcode) -> Result<Self, Self::Error> {
        use Instruction::*;

        let (x, y, n, kk, addr) = (op.x(), op.y(), op.n(), op.kk(), op.nnn());
        let unknown = Chip8Error::UnknownOpcode { opcode: op.0 };

        let instruction = match op.category() {
            0x0 => match kk {
                0xE0 => ClearScreen,
                0xEE => Return,
                _ => return Err(unknown),
            },
            0x1 => Jump { addr },
            0x2 => Call { addr },
            0x3 => SkipIfEqualImm { x, kk },
            0x4 => SkipIfNotEqualImm { x, kk },
            0x5 if n == 0 => SkipIfEqual { x, y },
            0x6 => LoadImm { x, kk },
            0x7 => AddImm { x, kk },
            0x8 => match n {
                0x0 => Move { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => Add { x, y },
                0x5 => Sub { x, y },
                0x6 => ShiftRight { x },
                0x7 => SubReverse { x, y },
                0xE => ShiftLeft { x },
                _ => return Err(unknown),
            },
            0x9 if n == 0 => SkipIfNotEqual { x, y },
            0xA => SetIndex { addr },
            0xB => JumpPlusV0 { addr },
            0xC => Random { x, kk },
            0xD => Draw { x, y, n },
            0xE => match kk {
                0x9E => SkipIfKey { x },
                0xA1 => SkipIfNotKey { x },
                _ => return Err(unknown),
            },
            0xF => match kk {
                0x07 => GetDelay { x },
                0x0A => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1E => AddIndex { x },
                0x29 => FontAddress { x },
                0x33 => StoreBcd { x },
                0x55 => DumpRegisters { x },
                0x65 => LoadRegisters { x },
                _ => return Err(unknown),
            },
            _ => return Err(unknown),
        };
        Ok(instruction)
    }
}
