use error::ErrorMask;
use hal::{Block, Converter, ConverterKind, Hal, Tile, TileSet, CHANNELS, MAX_TILES};
use regs;
use sysref::{self, CapturePoint};

/// SYSREF edges the marker counter needs to settle.
pub const MARKER_COUNT: u32 = 4;
/// Compare every enabled FIFO of a tile against channel 0.
pub const CHECK_ALL_FIFOS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSample {
    pub count: u32,
    pub loc: u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Markers([Option<MarkerSample>; MAX_TILES as usize]);

impl Markers {
    pub fn get(&self, index: u8) -> Option<MarkerSample> {
        self.0.get(index as usize).and_then(|sample| *sample)
    }

    pub fn set(&mut self, index: u8, sample: MarkerSample) {
        self.0[index as usize] = Some(sample)
    }
}

fn read<H: Hal>(conv: &mut Converter<H>, tile: Tile, channel: u8) -> (MarkerSample, bool) {
    let block = Block::channel(tile, channel);
    match tile.kind {
        ConverterKind::Adc => {
            let value = conv.read(block, regs::ADC_MARKER);
            let sample = MarkerSample {
                count: value & regs::AMARK_CNT_M,
                loc: (value & regs::AMARK_LOC_M) >> regs::AMARK_LOC_S,
            };
            (sample, value & regs::AMARK_DONE != 0)
        }
        ConverterKind::Dac => {
            let sample = MarkerSample {
                count: conv.read(block, regs::DAC_MARKER_CNT) & regs::DMARK_CNT_M,
                loc: conv.read(block, regs::DAC_MARKER_LOC) & regs::DMARK_LOC_M,
            };
            // DAC markers carry no done flag
            (sample, true)
        }
    }
}

/// Captures the FIFO marker of each tile a fixed delay after the FIFOs were
/// enabled.
///
/// Faults are recorded in the returned mask and never stop the sampling of
/// the remaining tiles; a tile whose marker did not complete still gets the
/// values read back.
pub fn measure<H: Hal>(conv: &mut Converter<H>, tiles: TileSet, settle_delay: u32)
        -> (Markers, ErrorMask) {
    let mut status = ErrorMask::empty();
    let mut markers = Markers::default();

    match conv.kind {
        ConverterKind::Adc => {
            conv.write(Block::Global, regs::ADC_MARKER_RST, 1);
            conv.write(Block::Global, regs::ADC_MARKER_RST, 0);
        }
        ConverterKind::Dac => {
            for index in tiles.iter() {
                let tile = conv.tile(index);
                sysref::capture(conv, tile, CapturePoint::T1, true, false);
            }
            conv.write(Block::Global, regs::DAC_MARKER_CTRL, settle_delay);
        }
    }

    if status.record(sysref::wait_edges(conv, MARKER_COUNT)).is_none() {
        error!("SYSREF not seen while {} markers settled", conv.kind);
    }

    for index in tiles.iter() {
        let tile = conv.tile(index);
        let (master, done) = read(conv, tile, 0);
        if tile.kind == ConverterKind::Dac {
            // stop counting so the readings stay put
            sysref::capture(conv, tile, CapturePoint::T1, false, false);
        }
        debug!("{}: marker count {}, loc {}, done {}", tile, master.count, master.loc, done);
        markers.set(index, master);
        if !done {
            error!("{}: marker not done, SYSREF not detected", tile);
            status |= ErrorMask::MARKER_RUN;
        }

        if CHECK_ALL_FIFOS {
            for channel in 1..CHANNELS {
                if !conv.hal.channel_enabled(tile, channel) {
                    continue
                }
                let (sample, _) = read(conv, tile, channel);
                if sample != master {
                    error!("{}: FIFO {} marker {:?} does not match FIFO 0 {:?}",
                           tile, channel, sample, master);
                    status |= ErrorMask::MARKER_MISMATCH;
                }
            }
        }
    }
    (markers, status)
}
