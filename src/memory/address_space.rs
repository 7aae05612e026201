//! A 64 KiB address space built from 256-byte pages.
//!
//! Every page either points into one of the byte buffers owned by the space (RAM, PRG-ROM, CHR,
//! nametable RAM, palette RAM) or is unmapped. Buffers may be smaller than the window they are
//! mapped into, in which case they tile across it, which is how the console mirrors its 2 KiB of
//! work RAM over $0000–$1FFF. A handful of register traps sit in front of the page table and
//! route accesses in their range to a [`RegisterIo`] handler instead (PPU registers, joysticks,
//! OAM DMA, APU).

use std::ops::Range;

/// Bytes per page.
pub const PAGE_SIZE: usize = 256;
/// Pages in a 16-bit space.
pub const PAGE_COUNT: usize = 256;
/// Register trap slots. Registrations past this are dropped.
pub const TRAP_SLOTS: usize = 4;
/// Value read from unmapped pages.
pub const OPEN_BUS: u8 = 0;

/// Handle to a buffer attached to an [`AddressSpace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Page {
    #[default]
    Unmapped,
    Mapped {
        buffer: BufferId,
        offset: usize,
        mask: u8,
        writable: bool,
    },
}

#[derive(Clone, Copy, Debug)]
struct Trap<P> {
    start: u16,
    end: u16,
    port: P,
}

/// Receives accesses that land in a trapped register range.
///
/// `port` is the tag the range was registered with, so a single handler can serve several
/// windows.
pub trait RegisterIo<P> {
    fn read_register(&mut self, port: P, address: u16) -> u8;
    fn write_register(&mut self, port: P, address: u16, value: u8);
}

/// Handler for spaces without traps.
pub struct NoRegisters;

impl<P> RegisterIo<P> for NoRegisters {
    fn read_register(&mut self, _port: P, _address: u16) -> u8 {
        OPEN_BUS
    }

    fn write_register(&mut self, _port: P, _address: u16, _value: u8) {}
}

/// Paged address space with register traps. `P` tags the trap windows.
pub struct AddressSpace<P = ()> {
    buffers: Vec<Vec<u8>>,
    pages: [Page; PAGE_COUNT],
    traps: [Option<Trap<P>>; TRAP_SLOTS],
}

impl<P: Copy> Default for AddressSpace<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy> AddressSpace<P> {
    /// Empty space: no buffers, every page unmapped, no traps.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            pages: [Page::Unmapped; PAGE_COUNT],
            traps: [None; TRAP_SLOTS],
        }
    }

    /// Take ownership of `data` and return a handle that can be mapped.
    pub fn attach(&mut self, data: Vec<u8>) -> BufferId {
        self.buffers.push(data);
        BufferId(self.buffers.len() - 1)
    }

    pub fn buffer(&self, id: BufferId) -> &[u8] {
        &self.buffers[id.0]
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> &mut [u8] {
        &mut self.buffers[id.0]
    }

    /// Map the whole of `buffer` over `start..=end`, tiling it if the window is larger.
    pub fn map(&mut self, buffer: BufferId, start: u16, end: u16) {
        let len = self.buffers[buffer.0].len();
        self.map_pages(buffer, 0..len, start, end, true);
    }

    /// Like [`map`](Self::map), but writes through these pages are discarded.
    pub fn map_read_only(&mut self, buffer: BufferId, start: u16, end: u16) {
        let len = self.buffers[buffer.0].len();
        self.map_pages(buffer, 0..len, start, end, false);
    }

    /// Map the page-aligned sub-range `source` of `buffer` over `start..=end`.
    pub fn map_slice(&mut self, buffer: BufferId, source: Range<usize>, start: u16, end: u16) {
        self.map_pages(buffer, source, start, end, true);
    }

    /// Map a buffer smaller than a page: every page in the window sees offset `address & mask`
    /// of the buffer's start.
    pub fn map_masked(&mut self, buffer: BufferId, start: u16, end: u16, mask: u8) {
        check_window(start, end);
        assert!(
            self.buffers[buffer.0].len() > mask as usize,
            "buffer of {} bytes cannot back mask {mask:#04X}",
            self.buffers[buffer.0].len()
        );

        for page in page_range(start, end) {
            self.pages[page] = Page::Mapped {
                buffer,
                offset: 0,
                mask,
                writable: true,
            };
        }
    }

    fn map_pages(
        &mut self,
        buffer: BufferId,
        source: Range<usize>,
        start: u16,
        end: u16,
        writable: bool,
    ) {
        check_window(start, end);
        assert!(
            source.start % PAGE_SIZE == 0 && source.len() % PAGE_SIZE == 0 && !source.is_empty(),
            "source range {source:#X?} is not a whole number of pages"
        );
        assert!(
            source.end <= self.buffers[buffer.0].len(),
            "source range {source:#X?} exceeds buffer of {} bytes",
            self.buffers[buffer.0].len()
        );

        let source_pages = source.len() / PAGE_SIZE;
        let pages = page_range(start, end);
        assert!(
            pages.len() % source_pages == 0,
            "{} destination pages do not tile {} source pages",
            pages.len(),
            source_pages
        );

        for (i, page) in pages.enumerate() {
            self.pages[page] = Page::Mapped {
                buffer,
                offset: source.start + (i % source_pages) * PAGE_SIZE,
                mask: 0xFF,
                writable,
            };
        }
    }

    /// Return `start..=end` to the unmapped state.
    pub fn unmap(&mut self, start: u16, end: u16) {
        check_window(start, end);
        for page in page_range(start, end) {
            self.pages[page] = Page::Unmapped;
        }
    }

    /// Route `start..=end` to the register handler under `port`. Returns false when every trap
    /// slot is taken; the registration is then ignored.
    pub fn map_register(&mut self, start: u16, end: u16, port: P) -> bool {
        assert!(start <= end, "register range {start:#06X}..={end:#06X} is empty");

        match self.traps.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(Trap { start, end, port });
                true
            }
            None => {
                log::warn!("register trap table full, dropping ${start:04X}-${end:04X}");
                false
            }
        }
    }

    #[inline]
    fn trap(&self, address: u16) -> Option<P> {
        self.traps
            .iter()
            .flatten()
            .find(|trap| (trap.start..=trap.end).contains(&address))
            .map(|trap| trap.port)
    }

    /// Read a byte, dispatching trapped addresses to `io`.
    #[inline]
    pub fn read<R: RegisterIo<P>>(&self, address: u16, io: &mut R) -> u8 {
        match self.trap(address) {
            Some(port) => io.read_register(port, address),
            None => self.peek(address),
        }
    }

    /// Write a byte, dispatching trapped addresses to `io`.
    #[inline]
    pub fn write<R: RegisterIo<P>>(&mut self, address: u16, value: u8, io: &mut R) {
        match self.trap(address) {
            Some(port) => io.write_register(port, address, value),
            None => self.poke(address, value),
        }
    }

    /// Read through the page table only. Traps are not consulted.
    #[inline]
    pub fn peek(&self, address: u16) -> u8 {
        match self.pages[(address >> 8) as usize] {
            Page::Unmapped => OPEN_BUS,
            Page::Mapped {
                buffer,
                offset,
                mask,
                ..
            } => self.buffers[buffer.0][offset + (address as u8 & mask) as usize],
        }
    }

    /// Write through the page table only. Unmapped and read-only pages drop the write.
    #[inline]
    pub fn poke(&mut self, address: u16, value: u8) {
        if let Page::Mapped {
            buffer,
            offset,
            mask,
            writable: true,
        } = self.pages[(address >> 8) as usize]
        {
            self.buffers[buffer.0][offset + (address as u8 & mask) as usize] = value;
        }
    }

    /// Hex and ASCII dump of `start..=end` in 16-byte rows, preceded by a column header.
    pub fn dump(&self, start: u16, end: u16) -> String {
        assert!(start % 16 == 0, "dump must start on a 16-byte row");
        assert!(end % 16 == 15, "dump must end on a 16-byte row");

        let mut out = String::from("      00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n");
        for row in (start as u32..=end as u32).step_by(16) {
            let bytes: Vec<u8> = (row..row + 16).map(|a| self.peek(a as u16)).collect();
            out.push_str(&format!("{row:04X}: "));
            for b in &bytes {
                out.push_str(&format!("{b:02X} "));
            }
            for &b in &bytes {
                out.push(if (0x20..0x7F).contains(&b) { b as char } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

fn check_window(start: u16, end: u16) {
    assert!(
        start as usize % PAGE_SIZE == 0,
        "window start {start:#06X} is not page aligned"
    );
    assert!(
        end as usize % PAGE_SIZE == PAGE_SIZE - 1,
        "window end {end:#06X} does not end a page"
    );
    assert!(start <= end, "window {start:#06X}..={end:#06X} is empty");
}

fn page_range(start: u16, end: u16) -> Range<usize> {
    (start >> 8) as usize..(end >> 8) as usize + 1
}
