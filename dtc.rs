use core::str;

use error::ErrorMask;
use hal::{Converter, Hal, MAX_TILES};
use sysref::{self, CapturePoint};

pub const NUM_DTC: usize = 128;
/// Code the reference tile aims for: the middle of the delay line.
pub const REF_TARGET: u8 = 64;
/// SYSREF edges to let each candidate code settle.
pub const DTC_COUNT: u32 = 10;

pub const FLAG_EARLY: u8 = 1 << 0;
pub const FLAG_LATE: u8 = 1 << 1;
pub const FLAG_OVERLAP: u8 = FLAG_EARLY | FLAG_LATE;

/// One capture flag per code, plus the boundary entry past the last code.
pub type Flags = [u8; NUM_DTC + 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Initial,
    Reload
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStats {
    pub windows: u32,
    pub max_gap: u32,
    pub min_gap: u32,
    pub max_overlap: u32
}

/// Delay-line calibration of one capture point across the tiles of a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayCalibration {
    pub point: CapturePoint,
    pub ref_tile: u8,
    pub mode: ScanMode,
    pub target: [u8; MAX_TILES as usize],
    pub code: [Option<u8>; MAX_TILES as usize],
    pub stats: [WindowStats; MAX_TILES as usize]
}

impl DelayCalibration {
    /// Supplying `targets` replays a previous calibration.
    pub fn new(point: CapturePoint, ref_tile: u8, targets: Option<[u8; MAX_TILES as usize]>)
            -> DelayCalibration {
        DelayCalibration {
            point: point,
            ref_tile: ref_tile,
            mode: if targets.is_some() { ScanMode::Reload } else { ScanMode::Initial },
            target: targets.unwrap_or([REF_TARGET; MAX_TILES as usize]),
            code: [None; MAX_TILES as usize],
            stats: [WindowStats::default(); MAX_TILES as usize],
        }
    }

    /// Clears the results of a previous run. Initial scans also drop the
    /// targets derived from the previous reference code.
    pub fn reset(&mut self) {
        if self.mode == ScanMode::Initial {
            self.target = [REF_TARGET; MAX_TILES as usize];
        }
        self.code = [None; MAX_TILES as usize];
        self.stats = [WindowStats::default(); MAX_TILES as usize];
    }

    /// Reload record reproducing the codes found by this calibration. Tiles
    /// without a code keep their previous target.
    pub fn reload(&self) -> DelayCalibration {
        let mut target = self.target;
        for (target, code) in target.iter_mut().zip(self.code.iter()) {
            if let &Some(code) = code {
                *target = code;
            }
        }
        DelayCalibration::new(self.point, self.ref_tile, Some(target))
    }
}

struct Candidates {
    codes: [u8; NUM_DTC + 1],
    len: usize
}

impl Candidates {
    fn iter<'a>(&'a self) -> impl Iterator<Item = u8> + 'a {
        self.codes[..self.len].iter().cloned()
    }
}

/// Finds the stable windows of a scan: spans between consecutive flagged
/// codes wider than `min_gap`. The scan start counts as a flag at -1 and the
/// boundary entry as one at `NUM_DTC`.
fn windows(flags: &Flags, min_gap: u32) -> (Candidates, WindowStats) {
    let mut candidates = Candidates { codes: [0; NUM_DTC + 1], len: 0 };
    let mut stats = WindowStats { windows: 0, max_gap: 0, min_gap: NUM_DTC as u32, max_overlap: 0 };
    let mut last: i32 = -1;
    let mut overlap = 0;

    for index in 0..NUM_DTC + 1 {
        let gap = (index as i32 - last) as u32;
        if flags[index] != 0 || index == NUM_DTC {
            let centre = last + (gap / 2) as i32;
            if gap > min_gap && centre >= 0 {
                candidates.codes[candidates.len] = centre as u8;
                candidates.len += 1;
            }
            stats.max_gap = stats.max_gap.max(gap);
            stats.min_gap = stats.min_gap.min(gap);
            last = index as i32;
        }
        if flags[index] == FLAG_OVERLAP {
            overlap += 1;
            stats.max_overlap = stats.max_overlap.max(overlap);
        } else {
            overlap = 0;
        }
    }
    stats.windows = candidates.len as u32;
    (candidates, stats)
}

fn nearest(candidates: &Candidates, target: i32) -> Option<u8> {
    let mut best = None;
    let mut best_diff = i32::max_value();
    for code in candidates.iter() {
        let diff = (code as i32 - target).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some(code);
        }
    }
    best
}

fn least_spread(candidates: &Candidates, lo: i32, hi: i32) -> Option<u8> {
    let mut best = None;
    let mut best_growth = i32::max_value();
    for code in candidates.iter() {
        let code_i = code as i32;
        let growth = (lo - code_i).max(0) + (code_i - hi).max(0);
        if growth < best_growth {
            best_growth = growth;
            best = Some(code);
        }
    }
    best
}

/// Range spanned by the tile's target and the codes other tiles already
/// settled on.
fn envelope(calib: &DelayCalibration, tile: u8) -> (i32, i32) {
    let own = calib.target[tile as usize] as i32;
    let (mut lo, mut hi) = (own, own);
    for (index, code) in calib.code.iter().enumerate() {
        if let &Some(code) = code {
            if index != tile as usize {
                lo = lo.min(code as i32);
                hi = hi.max(code as i32);
            }
        }
    }
    (lo, hi)
}

fn reload_target(calib: &DelayCalibration, tile: u8) -> i32 {
    let r = calib.ref_tile as usize;
    let own = calib.target[tile as usize] as i32;
    if tile == calib.ref_tile {
        return own
    }
    match calib.code[r] {
        Some(ref_code) => ref_code as i32 + own - calib.target[r] as i32,
        None => own
    }
}

/// Picks the delay code of `tile` from its scan flags and records it, along
/// with the window statistics, in `calib`.
///
/// The reference tile has to be chosen before the others in both modes: in
/// an initial scan its code becomes their target, in a reload their targets
/// are replayed relative to it.
pub fn choose(flags: &Flags, calib: &mut DelayCalibration, tile: u8, min_gap: u32) -> Option<u8> {
    let (candidates, stats) = windows(flags, min_gap);
    calib.stats[tile as usize] = stats;
    debug!("  windows {}, gap max {} min {}, overlap {}",
           stats.windows, stats.max_gap, stats.min_gap, stats.max_overlap);

    let code = match calib.mode {
        ScanMode::Initial if tile == calib.ref_tile => {
            let code = nearest(&candidates, REF_TARGET as i32);
            calib.target[tile as usize] = REF_TARGET;
            if let Some(code) = code {
                for (index, target) in calib.target.iter_mut().enumerate() {
                    if index != tile as usize {
                        *target = code;
                    }
                }
            }
            code
        }
        ScanMode::Initial => {
            let (lo, hi) = envelope(calib, tile);
            debug!("  code envelope [{}, {}]", lo, hi);
            least_spread(&candidates, lo, hi)
        }
        ScanMode::Reload => {
            let target = reload_target(calib, tile);
            debug!("  reload target {}", target);
            nearest(&candidates, target)
        }
    };
    calib.code[tile as usize] = code;
    code
}

/// Printable picture of a scan, one character per code.
pub fn flag_map(flags: &Flags, code: Option<u8>) -> [u8; NUM_DTC] {
    let mut map = [b'.'; NUM_DTC];
    for (c, &flag) in map.iter_mut().zip(flags.iter()) {
        *c = match flag {
            0 => b'.',
            FLAG_EARLY => b'-',
            FLAG_LATE => b'+',
            _ => b'x',
        };
    }
    if let Some(code) = code {
        map[code as usize] = b'*';
    }
    map
}

/// Sweeps the delay line of one capture point of a tile and programs the
/// chosen code.
pub fn scan<H: Hal>(conv: &mut Converter<H>, index: u8, calib: &mut DelayCalibration) -> ErrorMask {
    let tile = conv.tile(index);
    let point = calib.point;
    let mut status = ErrorMask::empty();
    let mut missed = 0;

    info!("DTC scan {:?} on {}...", point, tile);
    sysref::capture(conv, tile, point, true, false);

    let mut flags: Flags = [0; NUM_DTC + 1];
    for code in 0..NUM_DTC {
        sysref::set_code(conv, tile, point, code as u8);
        sysref::clear_flags(conv, tile, point);
        if status.record(sysref::wait_edges(conv, DTC_COUNT)).is_none() {
            missed += 1;
        }
        flags[code] = sysref::flags(conv, tile, point);
    }
    if missed != 0 {
        error!("  SYSREF not seen on {} for {}/{} codes", tile, missed, NUM_DTC);
    }
    flags[NUM_DTC] = FLAG_EARLY;

    let code = choose(&flags, calib, index, point.min_gap());
    if let Ok(map) = str::from_utf8(&flag_map(&flags, code)) {
        debug!("  {}", map);
    }

    match code {
        Some(code) => {
            sysref::set_code(conv, tile, point, code);
            info!("  ...done, code {} (target {})", code, calib.target[index as usize]);
        }
        None => {
            sysref::set_code(conv, tile, point, 0);
            error!("  unable to capture SYSREF safely on {} at {:?}", tile, point);
            status |= ErrorMask::DTC_INVALID;
        }
    }

    match point {
        CapturePoint::Pll => sysref::capture(conv, tile, point, false, false),
        CapturePoint::T1 => {
            sysref::capture(conv, tile, point, true, true);
            status.record(sysref::wait_edges(conv, DTC_COUNT));
            sysref::capture(conv, tile, point, true, false);
        }
    }
    status
}
