use std::collections::HashMap;

const PAGE_BITS: u32 = 16;
const PAGE_SIZE: usize = 1 << PAGE_BITS;
const PAGE_MASK: u32 = (PAGE_SIZE as u32) - 1;

type Page = Box<[u8; PAGE_SIZE]>;

/// Little-endian guest address space. Pages are allocated on first write and
/// unmapped reads return zero.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    pages: HashMap<u32, Page>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn page(&self, address: u32) -> Option<&Page> {
        self.pages.get(&(address >> PAGE_BITS))
    }

    fn page_mut(&mut self, address: u32) -> &mut Page {
        self.pages
            .entry(address >> PAGE_BITS)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]))
    }

    pub fn read_u8(&self, address: u32) -> u8 {
        self.page(address)
            .map(|page| page[(address & PAGE_MASK) as usize])
            .unwrap_or(0)
    }

    pub fn write_u8(&mut self, address: u32, value: u8) {
        self.page_mut(address)[(address & PAGE_MASK) as usize] = value;
    }

    pub fn read_u16(&self, address: u32) -> u16 {
        let mut bytes = [0; 2];

        self.read_bytes(address, &mut bytes);

        u16::from_le_bytes(bytes)
    }

    pub fn write_u16(&mut self, address: u32, value: u16) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn read_u32(&self, address: u32) -> u32 {
        let mut bytes = [0; 4];

        self.read_bytes(address, &mut bytes);

        u32::from_le_bytes(bytes)
    }

    pub fn write_u32(&mut self, address: u32, value: u32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    /// Fills `buffer` starting at `address`, wrapping around the address space.
    pub fn read_bytes(&self, address: u32, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.read_u8(address.wrapping_add(i as u32));
        }
    }

    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.write_u8(address.wrapping_add(i as u32), *byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::Memory;

    #[test]
    fn unmapped_reads_zero() {
        let memory = Memory::new();

        assert_eq!(memory.read_u32(0xDEAD_BEE0), 0);
        assert!(memory.pages.is_empty());
    }

    #[test]
    fn write_read() {
        let mut memory = Memory::new();

        memory.write_u8(0x1, 1);
        assert_eq!(memory.read_u8(0x1), 1);

        // u16
        memory.write_u16(0x10, 0xBEEF);
        assert_eq!(memory.read_u16(0x10), 0xBEEF);
        assert_eq!(memory.read_u8(0x10), 0xEF);

        // u32
        memory.write_u32(0x20, 0x1234_5678);
        assert_eq!(memory.read_u32(0x20), 0x1234_5678);
        assert_eq!(memory.read_u16(0x22), 0x1234);
    }

    #[test]
    fn crosses_page_boundary() {
        let mut memory = Memory::new();

        memory.write_u32(0xFFFE, 0xAABB_CCDD);

        assert_eq!(memory.read_u32(0xFFFE), 0xAABB_CCDD);
        assert_eq!(memory.pages.len(), 2);
    }

    #[test]
    fn bulk() {
        let mut memory = Memory::new();
        let mut buffer = [0; 5];

        memory.write_bytes(0x8000_0000, b"hello");
        memory.read_bytes(0x8000_0000, &mut buffer);

        assert_eq!(&buffer, b"hello");
    }
}
