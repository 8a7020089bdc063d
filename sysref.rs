use error::{ErrorMask, Timeout};
use hal::{Block, Converter, ConverterKind, Hal, Tile};
use regs;

/// Poll budget of the SYSREF edge counter. There is no wall clock here,
/// so every wait is bounded by a number of counter reads instead.
pub const SRCOUNT_TIMEOUT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePoint {
    Pll,
    T1
}

impl CapturePoint {
    /// Narrowest stable window accepted by the delay scan, in codes.
    pub fn min_gap(&self) -> u32 {
        match self {
            &CapturePoint::Pll => 5,
            &CapturePoint::T1 => 10,
        }
    }

    fn control_reg(&self) -> u16 {
        match self {
            &CapturePoint::Pll => regs::SRCAP_PLL,
            &CapturePoint::T1 => regs::SRCAP_T1,
        }
    }

    fn clear_strobe(&self) -> u32 {
        match self {
            &CapturePoint::Pll => regs::SRCLR_PLL,
            &CapturePoint::T1 => regs::SRCLR_T1,
        }
    }

    fn flag_shift(&self) -> u32 {
        match self {
            &CapturePoint::Pll => regs::SRFLAG_PLL_S,
            &CapturePoint::T1 => regs::SRFLAG_T1_S,
        }
    }
}

pub fn enable_receiver<H: Hal>(conv: &mut Converter<H>, enable: bool) {
    let value = if enable { regs::SRCAP_EN_TRX } else { 0 };
    conv.modify(Block::Global, regs::SRCAP_TRX, regs::SRCAP_EN_TRX, value);
}

/// Routes SYSREF to every ADC and DAC tile. `dac_tiles` of `None` picks the
/// topology from the device: parts with high-speed ADCs carry two DAC tiles,
/// the others four.
pub fn configure_distribution<H: Hal>(conv: &mut Converter<H>, dac_tiles: Option<u8>)
        -> Result<(), ErrorMask> {
    let dac_tiles = match dac_tiles {
        Some(n) => n,
        None => if conv.hal.high_speed_adc() { 2 } else { 4 },
    };

    let (dac_routes, adc3_route): (&[(u8, u32)], u32) = match dac_tiles {
        2 => (&regs::SRDIST_DAC2[..], regs::SRDIST_DAC2_ADC3),
        4 => (&regs::SRDIST_DAC4[..], regs::SRDIST_DAC4_ADC3),
        n => {
            error!("unsupported SYSREF distribution for {} DAC tiles", n);
            return Err(ErrorMask::NOT_SUPPORTED)
        }
    };

    for &(index, route) in dac_routes.iter() {
        conv.write(Block::Tile(ConverterKind::Dac, index), regs::SRDIST, route);
    }
    conv.write(Block::Tile(ConverterKind::Adc, 3), regs::SRDIST, adc3_route);
    for &(index, route) in regs::SRDIST_ADC.iter() {
        conv.write(Block::Tile(ConverterKind::Adc, index), regs::SRDIST, route);
    }
    debug!("SYSREF distributed to {} DAC tiles", dac_tiles);
    Ok(())
}

/// Enables or disables SYSREF capture at one point of a tile.
///
/// For T1 the analog latch and the divider reset sit on the same bus as the
/// clear strobe; they must never change while the strobe is asserted or a
/// spurious capture gets recorded, hence the fixed sequence below.
pub fn capture<H: Hal>(conv: &mut Converter<H>, tile: Tile, point: CapturePoint,
                       enable: bool, reset_div: bool) {
    let block = Block::tile(tile);
    match point {
        CapturePoint::Pll => {
            let value = if enable { regs::SRCAP_PLL_EN } else { 0 };
            conv.modify(block, regs::SRCAP_PLL, regs::SRCAP_PLL_EN, value);
        }
        CapturePoint::T1 => {
            conv.modify(block, regs::SRCAP_T1, regs::SRCAP_T1_INIT_M, 0);
            let latch = if enable { regs::SRCAP_T1_EN } else { 0 };
            conv.modify(block, regs::SRCAP_T1, regs::SRCAP_T1_EN, latch);
            let reset = if reset_div { regs::SRCAP_T1_RST } else { 0 };
            conv.modify(block, regs::SRCAP_T1, regs::SRCAP_T1_RST, reset);
            let reset = if reset_div { regs::SRCAP_DIG_RST } else { 0 };
            conv.modify(block, regs::SRCAP_DIG, regs::SRCAP_DIG_RST, reset);
            conv.modify(block, regs::SRCAP_T1, regs::SRCLR_T1, regs::SRCLR_T1);
            if enable {
                conv.modify(block, regs::SRCAP_T1, regs::SRCAP_T1_EN, regs::SRCAP_T1_EN);
            }
            conv.modify(block, regs::SRCAP_T1, regs::SRCLR_T1, 0);
        }
    }
}

pub fn capture_enabled<H: Hal>(conv: &mut Converter<H>, tile: Tile) -> bool {
    conv.read(Block::tile(tile), regs::SRCAP_T1) & regs::SRCAP_T1_EN != 0
}

pub fn pll_active<H: Hal>(conv: &mut Converter<H>, tile: Tile) -> bool {
    conv.read(Block::tile(tile), regs::CLKSTAT) & regs::PLLEN != 0
}

pub fn set_code<H: Hal>(conv: &mut Converter<H>, tile: Tile, point: CapturePoint, code: u8) {
    conv.modify(Block::tile(tile), point.control_reg(), regs::SRDTC_M, code as u32);
}

pub fn clear_flags<H: Hal>(conv: &mut Converter<H>, tile: Tile, point: CapturePoint) {
    let block = Block::tile(tile);
    let strobe = point.clear_strobe();
    conv.modify(block, point.control_reg(), strobe, strobe);
    conv.modify(block, point.control_reg(), strobe, 0);
}

/// Early (bit 0) and late (bit 1) capture flags of the point.
pub fn flags<H: Hal>(conv: &mut Converter<H>, tile: Tile, point: CapturePoint) -> u8 {
    let value = conv.read(Block::tile(tile), regs::SRFLAG);
    ((value >> point.flag_shift()) & regs::SRFLAG_M) as u8
}

/// Restarts the SYSREF edge counter of the converter kind and waits for it
/// to reach `count`.
pub fn wait_edges<H: Hal>(conv: &mut Converter<H>, count: u32) -> Result<(), Timeout> {
    let (start, shift) = match conv.kind {
        ConverterKind::Adc => (regs::SRCOUNT_START_ADC, regs::SRCOUNT_ADC_S),
        ConverterKind::Dac => (regs::SRCOUNT_START_DAC, regs::SRCOUNT_DAC_S),
    };
    conv.write(Block::Global, regs::SRCOUNT_CTRL, start);
    for _ in 0..SRCOUNT_TIMEOUT {
        let edges = (conv.read(Block::Global, regs::SRCOUNT_VAL) >> shift) & regs::SRCOUNT_M;
        if edges >= count {
            return Ok(())
        }
    }
    Err(Timeout)
}
