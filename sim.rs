//! Register-level model of the converter blocks, for tests.

use std::collections::BTreeMap;

use dtc::NUM_DTC;
use hal::{Block, Capabilities, ConverterKind, Registers, Tile};
use regs;

fn slot(kind: ConverterKind, index: u8) -> usize {
    match kind {
        ConverterKind::Adc => index as usize,
        ConverterKind::Dac => 4 + index as usize,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Marker {
    pub count: u32,
    pub loc: u32,
    pub done: bool
}

pub struct Sim {
    pub regs: BTreeMap<(Block, u16), u32>,
    pub writes: Vec<(Block, u16, u32)>,
    pub sysref_alive: bool,
    pub srfreq: Option<u32>,
    pub high_speed_adc: bool,
    pub started: [bool; 8],
    pub mts: [bool; 8],
    pub channels: [[bool; 4]; 8],
    pub factor: [u32; 8],
    pub words: [(u32, u32); 8],
    pub pll_flags: [Option<[u8; NUM_DTC]>; 8],
    pub t1_flags: [[u8; NUM_DTC]; 8],
    pub markers: [[Marker; 4]; 8],
    counter: u32
}

impl Sim {
    pub fn new() -> Sim {
        Sim {
            regs: BTreeMap::new(),
            writes: Vec::new(),
            sysref_alive: true,
            srfreq: None,
            high_speed_adc: false,
            started: [true; 8],
            mts: [true; 8],
            channels: [[true; 4]; 8],
            factor: [1; 8],
            words: [(1, 1); 8],
            pll_flags: [None; 8],
            t1_flags: [[0; NUM_DTC]; 8],
            markers: [[Marker { count: 0, loc: 0, done: true }; 4]; 8],
            counter: 0,
        }
    }

    pub fn stored(&self, block: Block, offset: u16) -> u32 {
        *self.regs.get(&(block, offset)).unwrap_or(&0)
    }

    pub fn set_t1_flags(&mut self, kind: ConverterKind, index: u8, flags: [u8; NUM_DTC]) {
        self.t1_flags[slot(kind, index)] = flags;
    }

    pub fn set_pll_flags(&mut self, kind: ConverterKind, index: u8, flags: [u8; NUM_DTC]) {
        self.pll_flags[slot(kind, index)] = Some(flags);
    }

    /// Same marker on every channel of the tile.
    pub fn set_marker(&mut self, kind: ConverterKind, index: u8, count: u32, loc: u32) {
        for marker in self.markers[slot(kind, index)].iter_mut() {
            marker.count = count;
            marker.loc = loc;
            marker.done = true;
        }
    }

    pub fn marker_mut(&mut self, kind: ConverterKind, index: u8, channel: u8) -> &mut Marker {
        &mut self.markers[slot(kind, index)][channel as usize]
    }

    pub fn set_factor(&mut self, kind: ConverterKind, index: u8, factor: u32, words: (u32, u32)) {
        self.factor[slot(kind, index)] = factor;
        self.words[slot(kind, index)] = words;
    }

    pub fn writes_to(&self, block: Block, offset: u16) -> Vec<u32> {
        self.writes.iter()
            .filter(|&&(b, o, _)| b == block && o == offset)
            .map(|&(_, _, v)| v)
            .collect()
    }
}

/// Flag vector with the early bit set at each listed code.
pub fn edges(codes: &[usize]) -> [u8; NUM_DTC] {
    let mut flags = [0; NUM_DTC];
    for &code in codes {
        flags[code] = 1;
    }
    flags
}

impl Registers for Sim {
    fn read(&mut self, block: Block, offset: u16) -> u32 {
        match (block, offset) {
            (Block::Global, regs::SRCOUNT_VAL) => {
                if self.sysref_alive && self.counter < regs::SRCOUNT_M {
                    self.counter += 1;
                }
                (self.counter << regs::SRCOUNT_ADC_S) | (self.counter << regs::SRCOUNT_DAC_S)
            }
            (Block::Global, regs::SRFREQ_VAL) => match self.srfreq {
                Some(value) => (value << regs::SRFREQ_VAL_S) | regs::SRFREQ_DONE,
                None => 0,
            },
            (Block::Tile(kind, index), regs::CLKSTAT) => {
                if self.pll_flags[slot(kind, index)].is_some() { regs::PLLEN } else { 0 }
            }
            (Block::Tile(kind, index), regs::SRFLAG) => {
                let t1_code = (self.stored(block, regs::SRCAP_T1) & regs::SRDTC_M) as usize;
                let pll_code = (self.stored(block, regs::SRCAP_PLL) & regs::SRDTC_M) as usize;
                let t1 = self.t1_flags[slot(kind, index)][t1_code] as u32;
                let pll = self.pll_flags[slot(kind, index)].map(|f| f[pll_code]).unwrap_or(0) as u32;
                (t1 << regs::SRFLAG_T1_S) | (pll << regs::SRFLAG_PLL_S)
            }
            (Block::Channel(kind, index, channel), regs::ADC_MARKER) => {
                let m = self.markers[slot(kind, index)][channel as usize];
                (m.count & regs::AMARK_CNT_M) |
                    ((m.loc << regs::AMARK_LOC_S) & regs::AMARK_LOC_M) |
                    if m.done { regs::AMARK_DONE } else { 0 }
            }
            (Block::Channel(kind, index, channel), regs::DAC_MARKER_CNT) =>
                self.markers[slot(kind, index)][channel as usize].count & regs::DMARK_CNT_M,
            (Block::Channel(kind, index, channel), regs::DAC_MARKER_LOC) =>
                self.markers[slot(kind, index)][channel as usize].loc & regs::DMARK_LOC_M,
            _ => self.stored(block, offset)
        }
    }

    fn write(&mut self, block: Block, offset: u16, value: u32) {
        if block == Block::Global && offset == regs::SRCOUNT_CTRL {
            self.counter = 0;
        }
        self.writes.push((block, offset, value));
        self.regs.insert((block, offset), value);
    }
}

impl Capabilities for Sim {
    fn tile_started(&self, tile: Tile) -> bool {
        self.started[slot(tile.kind, tile.index)]
    }

    fn mts_enabled(&self, tile: Tile) -> bool {
        self.mts[slot(tile.kind, tile.index)]
    }

    fn channel_enabled(&self, tile: Tile, channel: u8) -> bool {
        self.channels[slot(tile.kind, tile.index)][channel as usize]
    }

    fn factor(&self, tile: Tile) -> u32 {
        self.factor[slot(tile.kind, tile.index)]
    }

    fn fifo_words(&self, tile: Tile) -> (u32, u32) {
        self.words[slot(tile.kind, tile.index)]
    }

    fn high_speed_adc(&self) -> bool {
        self.high_speed_adc
    }
}
