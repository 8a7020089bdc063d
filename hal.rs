use core::fmt;

pub const MAX_TILES: u8 = 4;
pub const CHANNELS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConverterKind {
    Adc,
    Dac
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &ConverterKind::Adc => write!(f, "ADC"),
            &ConverterKind::Dac => write!(f, "DAC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: ConverterKind,
    pub index: u8
}

impl Tile {
    pub fn new(kind: ConverterKind, index: u8) -> Tile {
        Tile { kind: kind, index: index }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} tile {}", self.kind, self.index)
    }
}

/// Tiles taking part in one synchronization run, one bit per tile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileSet(u8);

impl TileSet {
    pub const fn empty() -> TileSet {
        TileSet(0)
    }

    pub const fn from_bits(bits: u8) -> TileSet {
        TileSet(bits)
    }

    pub fn all() -> TileSet {
        TileSet((1 << MAX_TILES) - 1)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, index: u8) -> bool {
        index < 8 && self.0 & (1 << index) != 0
    }

    /// Bits that do not name a tile.
    pub fn invalid_bits(&self) -> u8 {
        self.0 & !TileSet::all().0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> {
        let bits = self.0;
        (0..MAX_TILES).filter(move |index| bits & (1 << index) != 0)
    }
}

/// Register block a tile-relative offset is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Block {
    Global,
    Tile(ConverterKind, u8),
    Channel(ConverterKind, u8, u8)
}

impl Block {
    pub fn tile(tile: Tile) -> Block {
        Block::Tile(tile.kind, tile.index)
    }

    pub fn channel(tile: Tile, channel: u8) -> Block {
        Block::Channel(tile.kind, tile.index, channel)
    }
}

pub trait Registers {
    fn read(&mut self, block: Block, offset: u16) -> u32;
    fn write(&mut self, block: Block, offset: u16, value: u32);

    fn modify(&mut self, block: Block, offset: u16, mask: u32, value: u32) {
        let current = self.read(block, offset);
        self.write(block, offset, (current & !mask) | (value & mask));
    }
}

pub trait Capabilities {
    fn tile_started(&self, tile: Tile) -> bool;
    fn mts_enabled(&self, tile: Tile) -> bool;
    fn channel_enabled(&self, tile: Tile, channel: u8) -> bool;
    /// Decimation (ADC) or interpolation (DAC) factor.
    fn factor(&self, tile: Tile) -> u32;
    /// FIFO (read, write) valid words per fabric cycle.
    fn fifo_words(&self, tile: Tile) -> (u32, u32);
    fn high_speed_adc(&self) -> bool;
}

pub trait Hal: Registers + Capabilities {}

impl<T: Registers + Capabilities> Hal for T {}

/// Access to the converter blocks of one kind.
///
/// All tiles of a kind share the FIFO mode register, the SYSREF edge counter
/// and the SYSREF frequency counter; the handle is the only path to them
/// during a run.
pub struct Converter<'a, H: Hal + 'a> {
    pub hal: &'a mut H,
    pub kind: ConverterKind
}

impl<'a, H: Hal + 'a> Converter<'a, H> {
    pub fn new(hal: &'a mut H, kind: ConverterKind) -> Converter<'a, H> {
        Converter { hal: hal, kind: kind }
    }

    pub fn tile(&self, index: u8) -> Tile {
        Tile::new(self.kind, index)
    }

    pub fn read(&mut self, block: Block, offset: u16) -> u32 {
        self.hal.read(block, offset)
    }

    pub fn write(&mut self, block: Block, offset: u16, value: u32) {
        self.hal.write(block, offset, value)
    }

    pub fn modify(&mut self, block: Block, offset: u16, mask: u32, value: u32) {
        self.hal.modify(block, offset, mask, value)
    }
}
