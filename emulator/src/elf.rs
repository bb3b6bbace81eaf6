use std::{collections::BTreeMap, ops::Range};

use object::{Architecture, BinaryFormat, Object, ObjectSection, ObjectSegment, ObjectSymbol};
use thiserror::Error;

use crate::memory::Memory;

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("Failed to parse the binary: {0}")]
    Parse(#[from] object::Error),
    #[error("Expected an ELF binary, found {format:?}")]
    NotElf { format: BinaryFormat },
    #[error("Expected a 32-bit binary")]
    Not32Bit,
    #[error("Expected a little-endian RISC-V binary, found {architecture:?}")]
    WrongMachine { architecture: Architecture },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    address: u32,
    data: Vec<u8>,
}

/// Loadable image and symbol table of a statically linked RV32 program.
#[derive(Debug, Clone)]
pub struct Program {
    entry: u32,
    segments: Vec<Segment>,
    symbols: BTreeMap<String, u32>,
    labels: BTreeMap<u32, String>,
    data: Option<Range<u32>>,
}

impl Program {
    pub fn parse(bytes: &[u8]) -> Result<Self, ElfError> {
        let file = object::File::parse(bytes)?;

        if file.format() != BinaryFormat::Elf {
            return Err(ElfError::NotElf {
                format: file.format(),
            });
        }

        if file.is_64() {
            return Err(ElfError::Not32Bit);
        }

        if file.architecture() != Architecture::Riscv32 || !file.is_little_endian() {
            return Err(ElfError::WrongMachine {
                architecture: file.architecture(),
            });
        }

        let mut segments = Vec::new();

        for segment in file.segments() {
            segments.push(Segment {
                address: segment.address() as u32,
                data: segment.data()?.to_vec(),
            });
        }

        let mut symbols = BTreeMap::new();
        let mut labels = BTreeMap::new();

        for symbol in file.symbols() {
            let Ok(name) = symbol.name() else {
                continue;
            };

            if name.is_empty() || symbol.is_undefined() {
                continue;
            }

            let address = symbol.address() as u32;

            symbols.insert(name.to_owned(), address);
            labels.entry(address).or_insert_with(|| name.to_owned());
        }

        let data = file.section_by_name(".data").map(|section| {
            let start = section.address() as u32;

            start..start.wrapping_add(section.size() as u32)
        });

        Ok(Self {
            entry: file.entry() as u32,
            segments,
            symbols,
            labels,
            data,
        })
    }

    pub fn entry(&self) -> u32 {
        self.entry
    }

    pub fn symbol(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    /// Name of a symbol placed exactly at `address`.
    pub fn symbol_at(&self, address: u32) -> Option<&str> {
        self.labels.get(&address).map(String::as_str)
    }

    /// Region a compliance test writes its results to.
    pub fn signature_range(&self) -> Option<Range<u32>> {
        match (self.symbol("begin_signature"), self.symbol("end_signature")) {
            (Some(start), Some(end)) => Some(start..end),
            (Some(start), None) => self.data.as_ref().map(|data| start..data.end),
            _ => self.data.clone(),
        }
    }

    /// Copies every loadable segment into `memory`. Zero-initialised data
    /// needs no copy since unmapped memory reads as zero.
    pub fn upload(&self, memory: &mut Memory) {
        for segment in &self.segments {
            memory.write_bytes(segment.address, &segment.data);
        }
    }
}
