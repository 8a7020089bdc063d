use core::fmt;

use byteorder::{BigEndian, ByteOrder};

use dtc::DelayCalibration;
use hal::{ConverterKind, MAX_TILES};
use mts::SyncConfig;
use sysref::CapturePoint;

const VERSION: u8 = 1;
const RECORD_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Truncated,
    InvalidVersion(u8),
    Store(&'static str)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Error::Truncated =>
                write!(f, "truncated calibration record"),
            &Error::InvalidVersion(version) =>
                write!(f, "unknown calibration record version {}", version),
            &Error::Store(err) =>
                write!(f, "{}", err),
        }
    }
}

/// Key/value storage provided by the host, e.g. the board's flash config.
/// A key that was never written reads as an empty value.
pub trait Store {
    fn read<F: FnOnce(Result<&[u8], Error>) -> R, R>(&self, key: &str, f: F) -> R;
    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), Error>;
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

fn key(kind: ConverterKind) -> &'static str {
    match kind {
        ConverterKind::Adc => "mts_adc",
        ConverterKind::Dac => "mts_dac",
    }
}

/// Outcome of a synchronization run worth keeping across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub aligned_target: Option<i32>,
    pub pll: [Option<u8>; MAX_TILES as usize],
    pub t1: [Option<u8>; MAX_TILES as usize]
}

fn encode_codes(codes: &[Option<u8>; MAX_TILES as usize], buf: &mut [u8]) {
    let mut mask = 0;
    for (index, code) in codes.iter().enumerate() {
        if let &Some(code) = code {
            mask |= 1 << index;
            buf[1 + index] = code;
        }
    }
    buf[0] = mask;
}

fn decode_codes(buf: &[u8]) -> [Option<u8>; MAX_TILES as usize] {
    let mut codes = [None; MAX_TILES as usize];
    for (index, code) in codes.iter_mut().enumerate() {
        if buf[0] & (1 << index) != 0 {
            *code = Some(buf[1 + index]);
        }
    }
    codes
}

/// Seeds a reload of `point` from saved codes; tiles without one keep
/// their current target.
fn replay(calib: &DelayCalibration, codes: &[Option<u8>; MAX_TILES as usize],
          point: CapturePoint, ref_tile: u8) -> Option<DelayCalibration> {
    if codes.iter().all(|code| code.is_none()) {
        return None
    }
    let mut targets = calib.target;
    for (target, code) in targets.iter_mut().zip(codes.iter()) {
        if let &Some(code) = code {
            *target = code;
        }
    }
    Some(DelayCalibration::new(point, ref_tile, Some(targets)))
}

impl Snapshot {
    pub fn from_config(config: &SyncConfig) -> Snapshot {
        Snapshot {
            aligned_target: config.aligned_target,
            pll: config.pll.code,
            t1: config.t1.code,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0; RECORD_SIZE];
        buf[0] = VERSION;
        if let Some(target) = self.aligned_target {
            buf[1] = 1;
            BigEndian::write_i32(&mut buf[2..6], target);
        }
        encode_codes(&self.pll, &mut buf[6..11]);
        encode_codes(&self.t1, &mut buf[11..16]);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Snapshot, Error> {
        if data.is_empty() {
            return Err(Error::Truncated)
        }
        if data[0] != VERSION {
            return Err(Error::InvalidVersion(data[0]))
        }
        if data.len() < RECORD_SIZE {
            return Err(Error::Truncated)
        }
        Ok(Snapshot {
            aligned_target: if data[1] != 0 { Some(BigEndian::read_i32(&data[2..6])) } else { None },
            pll: decode_codes(&data[6..11]),
            t1: decode_codes(&data[11..16]),
        })
    }

    /// Turns `config` into a reload of this snapshot: the saved codes
    /// become the delay targets and the saved latency the alignment target.
    pub fn apply(&self, config: &mut SyncConfig) {
        if let Some(pll) = replay(&config.pll, &self.pll, CapturePoint::Pll, config.ref_tile) {
            config.pll = pll;
        }
        if let Some(t1) = replay(&config.t1, &self.t1, CapturePoint::T1, config.ref_tile) {
            config.t1 = t1;
        }
        if self.aligned_target.is_some() {
            config.target_latency = self.aligned_target;
        }
    }
}

pub fn save<S: Store>(store: &mut S, kind: ConverterKind, config: &SyncConfig) -> Result<(), Error> {
    let snapshot = Snapshot::from_config(config);
    store.write(key(kind), &snapshot.encode())?;
    info!("{} calibration saved, latency {:?}", kind, snapshot.aligned_target);
    Ok(())
}

/// Returns `None` if nothing was saved for this converter kind.
pub fn load<S: Store>(store: &S, kind: ConverterKind) -> Result<Option<Snapshot>, Error> {
    store.read(key(kind), |result| {
        let data = result?;
        if data.is_empty() {
            return Ok(None)
        }
        Snapshot::decode(data).map(Some)
    })
}

pub fn forget<S: Store>(store: &mut S, kind: ConverterKind) -> Result<(), Error> {
    store.remove(key(kind))
}
