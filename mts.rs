use dtc::{self, DelayCalibration};
use error::ErrorMask;
use fifo::{self, FifoMode};
use hal::{Converter, ConverterKind, Hal, Tile, TileSet, MAX_TILES};
use latency;
use marker;
use sysref::{self, CapturePoint};

/// Delay, in fabric cycles, between FIFO enable and DAC marker capture.
pub const MARKER_DELAY: u32 = 15;

/// Settings and results of one synchronization run of a converter kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub ref_tile: u8,
    pub tiles: TileSet,
    /// `None` aligns to the latency of the first measured tile.
    pub target_latency: Option<i32>,
    pub marker_delay: u32,
    /// Leave T1 SYSREF capture enabled once aligned.
    pub sysref_enable: bool,
    pub pll: DelayCalibration,
    pub t1: DelayCalibration,
    pub latency: [i32; MAX_TILES as usize],
    pub offset: [u32; MAX_TILES as usize],
    pub aligned_target: Option<i32>
}

impl SyncConfig {
    /// Supplying targets for a capture point replays a previous calibration
    /// of it instead of searching from the middle of the delay line.
    pub fn new(ref_tile: u8, pll_targets: Option<[u8; MAX_TILES as usize]>,
               t1_targets: Option<[u8; MAX_TILES as usize]>) -> SyncConfig {
        SyncConfig {
            ref_tile: ref_tile,
            tiles: TileSet::empty(),
            target_latency: None,
            marker_delay: MARKER_DELAY,
            sysref_enable: true,
            pll: DelayCalibration::new(CapturePoint::Pll, ref_tile, pll_targets),
            t1: DelayCalibration::new(CapturePoint::T1, ref_tile, t1_targets),
            latency: [0; MAX_TILES as usize],
            offset: [0; MAX_TILES as usize],
            aligned_target: None,
        }
    }
}

fn validate<H: Hal>(hal: &H, kind: ConverterKind, config: &SyncConfig) -> ErrorMask {
    let mut status = ErrorMask::empty();
    if config.tiles.invalid_bits() != 0 {
        error!("{} tile set {:#04x} names missing tiles", kind, config.tiles.bits());
        status |= ErrorMask::TILE_NOT_READY;
    }
    if config.ref_tile >= MAX_TILES {
        error!("{} reference tile {} out of range", kind, config.ref_tile);
        status |= ErrorMask::TILE_NOT_READY;
    }
    for index in config.tiles.iter() {
        let tile = Tile::new(kind, index);
        if !hal.tile_started(tile) {
            error!("{} not started", tile);
            status |= ErrorMask::TILE_NOT_READY;
        } else if !hal.mts_enabled(tile) {
            error!("{} has no multi-tile sync support", tile);
            status |= ErrorMask::TILE_NOT_READY | ErrorMask::MTS_DISABLED;
        }
    }
    status
}

/// Reference tile first, then the others in ascending order.
fn scan_order(ref_tile: u8, tiles: TileSet) -> impl Iterator<Item = u8> {
    let first = if tiles.contains(ref_tile) { Some(ref_tile) } else { None };
    first.into_iter().chain(tiles.iter().filter(move |&index| index != ref_tile))
}

/// Synchronizes the tiles of `config` and brings them to a common latency.
///
/// Validation failures return before any register is touched. Past that
/// point every step runs to completion and the returned mask collects all
/// faults; `config` carries the per-tile latency and delay either way.
pub fn run<H: Hal>(hal: &mut H, kind: ConverterKind, config: &mut SyncConfig) -> ErrorMask {
    let mut status = validate(hal, kind, config);
    if !status.is_ok() {
        error!("{} multi-tile sync not started: {}", kind, status);
        return status
    }
    if !config.tiles.contains(config.ref_tile) {
        warn!("{} reference tile {} not part of the run", kind, config.ref_tile);
    }

    info!("{} multi-tile sync, tiles {:04b}, reference tile {}...",
          kind, config.tiles.bits(), config.ref_tile);
    config.latency = [0; MAX_TILES as usize];
    config.offset = [0; MAX_TILES as usize];
    config.aligned_target = None;

    let mut conv = Converter::new(hal, kind);
    fifo::set_mode(&mut conv, FifoMode::Disabled, TileSet::empty());
    sysref::enable_receiver(&mut conv, true);
    status.record(sysref::configure_distribution(&mut conv, None));

    config.pll.ref_tile = config.ref_tile;
    config.pll.reset();
    config.t1.ref_tile = config.ref_tile;
    config.t1.reset();

    for index in scan_order(config.ref_tile, config.tiles) {
        let tile = conv.tile(index);
        if sysref::pll_active(&mut conv, tile) {
            status |= dtc::scan(&mut conv, index, &mut config.pll);
        } else {
            debug!("{}: PLL off, skipping PLL capture scan", tile);
        }
    }
    for index in scan_order(config.ref_tile, config.tiles) {
        status |= dtc::scan(&mut conv, index, &mut config.t1);
    }

    fifo::set_mode(&mut conv, FifoMode::Enabled, config.tiles);
    let (markers, marker_status) = marker::measure(&mut conv, config.tiles, config.marker_delay);
    status |= marker_status;
    status |= latency::align(&mut conv, config, &markers);

    if status.is_ok() {
        info!("{} multi-tile sync done, latency {:?}", kind, config.aligned_target);
    } else {
        error!("{} multi-tile sync done with errors: {}", kind, status);
    }
    status
}

fn set_sysref<H: Hal>(hal: &mut H, kind: ConverterKind, tiles: TileSet, enable: bool) {
    let mut conv = Converter::new(hal, kind);
    for index in tiles.iter() {
        let tile = conv.tile(index);
        sysref::capture(&mut conv, tile, CapturePoint::T1, enable, false);
    }
}

/// Turns SYSREF capture of synchronized tiles on or off after the fact,
/// for instance to keep SYSREF from disturbing the converters in operation.
pub fn set_final_sysref_enable<H: Hal>(hal: &mut H, dac: Option<&SyncConfig>,
                                       adc: Option<&SyncConfig>, enable: bool) -> ErrorMask {
    let mut status = ErrorMask::empty();
    if let Some(config) = dac {
        status |= validate(hal, ConverterKind::Dac, config);
    }
    if let Some(config) = adc {
        status |= validate(hal, ConverterKind::Adc, config);
    }
    if !status.is_ok() {
        return status
    }

    if let Some(config) = dac {
        set_sysref(hal, ConverterKind::Dac, config.tiles, enable);
    }
    if let Some(config) = adc {
        set_sysref(hal, ConverterKind::Adc, config.tiles, enable);
    }
    // the receiver is shared between both kinds
    let mut conv = Converter::new(hal, ConverterKind::Adc);
    sysref::enable_receiver(&mut conv, enable);
    info!("final SYSREF capture {}", if enable { "enabled" } else { "disabled" });
    status
}
