use super::error::Chip8Error;

pub const STACK_DEPTH: usize = 16;

/// Return addresses for nested subroutine calls.
///
/// `push` writes at `pointer` then increments it, `pop` decrements then reads,
/// so `pointer` is always the current depth.
#[derive(Debug, Default)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    pointer: usize,
}

impl CallStack {
    pub fn push(&mut self, address: u16) -> Result<(), Chip8Error> {
        let slot = self
            .slots
            .get_mut(self.pointer)
            .ok_or(Chip8Error::StackOverflow { depth: STACK_DEPTH })?;
        *slot = address;
        self.pointer += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.pointer == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.pointer -= 1;
        Ok(self.slots[self.pointer])
    }

    pub fn depth(&self) -> usize {
        self.pointer
    }
}
