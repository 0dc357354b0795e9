//! Flat byte addressable memory.
use crate::{
    constants::MEM_SIZE_MAX,
    error::{Chp8Error, Chp8Result, OutOfBounds},
};

/// Main memory storage space.
///
/// Capacity is fixed when the machine is constructed. Every access is checked,
/// and an access outside the capacity leaves the contents untouched.
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    /// Allocate zeroed memory of the given capacity.
    ///
    /// Fails when the capacity can't be addressed by the 16-bit program counter,
    /// or when the allocation itself can't be reserved.
    pub fn new(capacity: usize) -> Chp8Result<Self> {
        if capacity == 0 || capacity > MEM_SIZE_MAX {
            return Err(Chp8Error::Config(
                "memory size must be between 1 and 65536 bytes",
            ));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| Chp8Error::Construction { capacity })?;
        data.resize(capacity, 0);

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn read(&self, index: usize) -> Result<u8, OutOfBounds> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_bounds(index))
    }

    #[inline]
    pub fn write(&mut self, index: usize, value: u8) -> Result<(), OutOfBounds> {
        let len = self.data.len();
        match self.data.get_mut(index) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(OutOfBounds::Memory { index, len }),
        }
    }

    /// Copy a block of bytes into memory starting at `offset`.
    ///
    /// Nothing is written when the block doesn't fit entirely.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> Result<(), OutOfBounds> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.out_of_bounds(offset.saturating_add(bytes.len())))?;

        self.data[offset..end].copy_from_slice(bytes);

        Ok(())
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn out_of_bounds(&self, index: usize) -> OutOfBounds {
        OutOfBounds::Memory {
            index,
            len: self.data.len(),
        }
    }
}
