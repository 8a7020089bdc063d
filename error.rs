use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Set of failure causes collected over a synchronization run.
///
/// Only `TILE_NOT_READY` (and its refinement `MTS_DISABLED`) stops a run;
/// every other cause is recorded and the run carries on with the remaining
/// tiles. An empty mask means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorMask(u32);

impl ErrorMask {
    pub const NOT_SUPPORTED: ErrorMask        = ErrorMask(1 << 0);
    pub const TIMEOUT: ErrorMask              = ErrorMask(1 << 1);
    pub const MARKER_RUN: ErrorMask           = ErrorMask(1 << 2);
    pub const MARKER_MISMATCH: ErrorMask      = ErrorMask(1 << 3);
    pub const DELAY_OVERFLOW: ErrorMask       = ErrorMask(1 << 4);
    pub const TARGET_TOO_LOW: ErrorMask       = ErrorMask(1 << 5);
    pub const TILE_NOT_READY: ErrorMask       = ErrorMask(1 << 6);
    pub const DTC_INVALID: ErrorMask          = ErrorMask(1 << 7);
    pub const MTS_DISABLED: ErrorMask         = ErrorMask(1 << 9);
    pub const SYSREF_FREQ_NOT_DONE: ErrorMask = ErrorMask(1 << 12);

    const NAMES: [(ErrorMask, &'static str); 10] = [
        (ErrorMask::NOT_SUPPORTED,        "not supported"),
        (ErrorMask::TIMEOUT,              "SYSREF timeout"),
        (ErrorMask::MARKER_RUN,           "marker not detected"),
        (ErrorMask::MARKER_MISMATCH,      "marker mismatch"),
        (ErrorMask::DELAY_OVERFLOW,       "delay overflow"),
        (ErrorMask::TARGET_TOO_LOW,       "target latency too low"),
        (ErrorMask::TILE_NOT_READY,       "tile not ready"),
        (ErrorMask::DTC_INVALID,          "no valid DTC code"),
        (ErrorMask::MTS_DISABLED,         "MTS not enabled"),
        (ErrorMask::SYSREF_FREQ_NOT_DONE, "SYSREF frequency counter not done"),
    ];

    pub const fn empty() -> ErrorMask {
        ErrorMask(0)
    }

    pub const fn from_bits(bits: u32) -> ErrorMask {
        ErrorMask(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: ErrorMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: ErrorMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Folds the error of `result`, if any, into the mask and hands back the
    /// value so the caller can keep going.
    pub fn record<T, E: Into<ErrorMask>>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                *self |= err.into();
                None
            }
        }
    }
}

impl BitOr for ErrorMask {
    type Output = ErrorMask;

    fn bitor(self, rhs: ErrorMask) -> ErrorMask {
        ErrorMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorMask {
    fn bitor_assign(&mut self, rhs: ErrorMask) {
        self.0 |= rhs.0
    }
}

impl fmt::Display for ErrorMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "ok")
        }
        let mut first = true;
        for &(flag, name) in ErrorMask::NAMES.iter() {
            if self.contains(flag) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        let unknown = self.0 & !ErrorMask::NAMES.iter().fold(0, |acc, &(flag, _)| acc | flag.0);
        if unknown != 0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "unknown (0x{:08x})", unknown)?;
        }
        Ok(())
    }
}

/// The SYSREF edge counter did not reach its threshold within the poll budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout;

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "timed out waiting for SYSREF edges")
    }
}

impl From<Timeout> for ErrorMask {
    fn from(_: Timeout) -> ErrorMask {
        ErrorMask::TIMEOUT
    }
}
