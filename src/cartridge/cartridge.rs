//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper, etc.), an optional
//! 512-byte trainer, then PRG ROM, then CHR ROM. A CHR size of zero means the board carries 8 KiB
//! of CHR RAM instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cartridge::mapper::Mirroring;

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_BANK_LEN: usize = 16 * 1024;
pub const CHR_BANK_LEN: usize = 8 * 1024;
const SIGNATURE: [u8; 4] = *b"NES\x1A";

const FLAG_VERTICAL: u8 = 0x01;
const FLAG_BATTERY: u8 = 0x02;
const FLAG_TRAINER: u8 = 0x04;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("error reading ROM from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("iNES header should be 16 bytes, file has {len}")]
    HeaderTooShort { len: usize },
    #[error("not an iNES image, signature was {found:02X?}")]
    BadSignature { found: [u8; 4] },
    #[error("{section} truncated: expected {expected} bytes, {available} available")]
    Truncated {
        section: &'static str,
        expected: usize,
        available: usize,
    },
    #[error("image has no PRG ROM")]
    EmptyPrgRom,
    #[error("unsupported mapper {id}")]
    UnsupportedMapper { id: u16 },
    #[error("mapper {id} cannot map {len} bytes of PRG ROM")]
    UnsupportedPrgSize { id: u16, len: usize },
    #[error("mapper {id} cannot map {len} bytes of CHR ROM")]
    UnsupportedChrSize { id: u16, len: usize },
}

/// A parsed iNES image.
#[derive(Clone, Debug)]
pub struct Cartridge {
    pub prg: Vec<u8>,
    /// CHR ROM; empty when the board uses CHR RAM.
    pub chr: Vec<u8>,
    pub mirroring: Mirroring,
    /// Battery-backed PRG RAM present.
    pub battery: bool,
    pub trainer: Option<Vec<u8>>,
    pub mapper_id: u16,
}

impl Cartridge {
    /// Read and parse an iNES file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    /// Parse an in-memory iNES image. Bytes 8–15 of the header are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < HEADER_LEN {
            return Err(LoadError::HeaderTooShort { len: data.len() });
        }
        let (header, mut rest) = data.split_at(HEADER_LEN);

        let found = [header[0], header[1], header[2], header[3]];
        if found != SIGNATURE {
            return Err(LoadError::BadSignature { found });
        }

        let prg_len = header[4] as usize * PRG_BANK_LEN;
        let chr_len = header[5] as usize * CHR_BANK_LEN;
        let flags6 = header[6];
        let flags7 = header[7];

        let mirroring = if flags6 & FLAG_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        // Mapper number: low nibble from flags 6, high nibble from flags 7.
        let mapper_id = ((flags7 & 0xF0) | (flags6 >> 4)) as u16;

        let trainer = if flags6 & FLAG_TRAINER != 0 {
            Some(take(&mut rest, TRAINER_LEN, "trainer")?.to_vec())
        } else {
            None
        };

        if prg_len == 0 {
            return Err(LoadError::EmptyPrgRom);
        }
        let prg = take(&mut rest, prg_len, "PRG ROM")?.to_vec();
        let chr = take(&mut rest, chr_len, "CHR ROM")?.to_vec();

        Ok(Self {
            prg,
            chr,
            mirroring,
            battery: flags6 & FLAG_BATTERY != 0,
            trainer,
            mapper_id,
        })
    }

    pub fn has_chr_ram(&self) -> bool {
        self.chr.is_empty()
    }
}

fn take<'a>(rest: &mut &'a [u8], len: usize, section: &'static str) -> Result<&'a [u8], LoadError> {
    if rest.len() < len {
        return Err(LoadError::Truncated {
            section,
            expected: len,
            available: rest.len(),
        });
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut data = vec![b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6, flags7];
        data.resize(HEADER_LEN, 0);
        if flags6 & FLAG_TRAINER != 0 {
            data.extend(std::iter::repeat_n(0xEE, TRAINER_LEN));
        }
        data.extend(std::iter::repeat_n(0xAA, prg_banks as usize * PRG_BANK_LEN));
        data.extend(std::iter::repeat_n(0xCC, chr_banks as usize * CHR_BANK_LEN));
        data
    }

    #[test]
    fn parses_nrom_header() {
        let cart = Cartridge::from_bytes(&image(2, 1, 0x01, 0x00)).unwrap();
        assert_eq!(cart.prg.len(), 32 * 1024);
        assert_eq!(cart.chr.len(), 8 * 1024);
        assert_eq!(cart.mirroring, Mirroring::Vertical);
        assert_eq!(cart.mapper_id, 0);
        assert!(!cart.battery);
        assert!(cart.trainer.is_none());
        assert!(cart.prg.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn mapper_id_combines_both_nibbles() {
        let cart = Cartridge::from_bytes(&image(1, 0, 0x12, 0x40)).unwrap();
        assert_eq!(cart.mapper_id, 0x41);
        assert_eq!(cart.mirroring, Mirroring::Horizontal);
        assert!(cart.battery);
        assert!(cart.has_chr_ram());
    }

    #[test]
    fn trainer_is_skipped() {
        let cart = Cartridge::from_bytes(&image(1, 1, FLAG_TRAINER, 0)).unwrap();
        assert_eq!(cart.trainer.as_deref().map(<[u8]>::len), Some(TRAINER_LEN));
        assert_eq!(cart.prg[0], 0xAA);
        assert_eq!(cart.chr[0], 0xCC);
    }

    #[test]
    fn rejects_bad_images() {
        assert!(matches!(
            Cartridge::from_bytes(b"NES\x1A"),
            Err(LoadError::HeaderTooShort { len: 4 })
        ));

        let mut data = image(1, 1, 0, 0);
        data[3] = 0;
        assert!(matches!(
            Cartridge::from_bytes(&data),
            Err(LoadError::BadSignature { .. })
        ));

        assert!(matches!(
            Cartridge::from_bytes(&image(0, 1, 0, 0)),
            Err(LoadError::EmptyPrgRom)
        ));

        let mut data = image(2, 1, 0, 0);
        data.truncate(HEADER_LEN + PRG_BANK_LEN + 100);
        assert!(matches!(
            Cartridge::from_bytes(&data),
            Err(LoadError::Truncated {
                section: "PRG ROM",
                expected: 32768,
                available: 16484,
            })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Cartridge::load("/nonexistent/rom.nes").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rom.nes"));
    }
}
