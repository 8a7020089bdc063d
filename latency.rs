use error::ErrorMask;
use hal::{Block, Converter, ConverterKind, Hal, CHANNELS, MAX_TILES};
use marker::Markers;
use mts::SyncConfig;
use regs;
use sysref::{self, CapturePoint};

/// Largest read delay the FIFO delay registers accept.
pub const DELAY_MAX: u32 = 31;

/// Read delay, in FIFO words, closest to `delta` samples. Rounds up only
/// when the remainder is strictly more than half a word.
pub fn delay_offset(delta: i32, factor: u32) -> u32 {
    let delta = delta.max(0) as u32;
    let factor = factor.max(1);
    let mut offset = delta / factor;
    if delta % factor > factor / 2 {
        offset += 1;
    }
    offset
}

fn saturate(value: i64) -> i32 {
    if value > i32::max_value() as i64 {
        i32::max_value()
    } else if value < i32::min_value() as i64 {
        i32::min_value()
    } else {
        value as i32
    }
}

/// SYSREF period in marker units.
fn sysref_period<H: Hal>(conv: &mut Converter<H>, count_w: i64, words: (u32, u32))
        -> Result<i64, ErrorMask> {
    let value = conv.read(Block::Global, regs::SRFREQ_VAL);
    if value & regs::SRFREQ_DONE == 0 {
        error!("{} SYSREF frequency counter not done", conv.kind);
        return Err(ErrorMask::SYSREF_FREQ_NOT_DONE)
    }
    let mut period = ((value & regs::SRFREQ_VAL_M) >> regs::SRFREQ_VAL_S) as i64 * count_w;
    let (read_words, write_words) = words;
    if conv.kind == ConverterKind::Dac && read_words != 0 {
        // DAC markers count in the write clock domain
        period = period * write_words as i64 / read_words as i64;
    }
    debug!("SYSREF period {} in {} marker units", period, conv.kind);
    Ok(period)
}

/// Brings every tile of the run to a common latency by programming FIFO
/// read delays, and reports the achieved latency and delay per tile in
/// `config`.
pub fn align<H: Hal>(conv: &mut Converter<H>, config: &mut SyncConfig, markers: &Markers) -> ErrorMask {
    let mut status = ErrorMask::empty();

    let reference = conv.tile(config.ref_tile);
    let factor = conv.hal.factor(reference).max(1);
    let words = conv.hal.fifo_words(reference);
    let count_w = words.0 as i64 * factor as i64;
    let loc_w = factor as i64;
    debug!("count weight {}, loc weight {}", count_w, loc_w);

    let period = status.record(sysref_period(conv, count_w, words)).unwrap_or(0);

    let mut measured = [false; MAX_TILES as usize];
    let mut target = None;
    let mut max_latency = i32::min_value();
    for index in config.tiles.iter() {
        let sample = match markers.get(index) {
            Some(sample) => sample,
            None => continue
        };
        let mut latency = saturate(sample.count as i64 * count_w + sample.loc as i64 * loc_w);
        let target = *target.get_or_insert(config.target_latency.unwrap_or(latency));

        // markers only resolve latency modulo one SYSREF period
        if period != 0 {
            let diff = target as i64 - latency as i64;
            let shifted = if diff > 0 { latency as i64 + period } else { latency as i64 - period };
            if (target as i64 - shifted).abs() < diff.abs() {
                latency = saturate(shifted);
                info!("{}{} latency moved by one SYSREF period to {}", conv.kind, index, latency);
            }
        }
        debug!("{}{}: latency {}", conv.kind, index, latency);

        config.latency[index as usize] = latency;
        measured[index as usize] = true;
        if latency > max_latency {
            max_latency = latency;
        }
    }

    let target = match target {
        Some(target) => target,
        None => {
            warn!("no {} markers to align", conv.kind);
            return status
        }
    };
    let aligned = if target < max_latency {
        if config.target_latency.is_some() {
            error!("{} target latency {} below achievable minimum {}", conv.kind, target, max_latency);
            status |= ErrorMask::TARGET_TOO_LOW;
        }
        max_latency
    } else {
        target
    };
    config.aligned_target = Some(aligned);

    for index in config.tiles.iter() {
        if !measured[index as usize] {
            continue
        }
        let tile = conv.tile(index);
        let latency = config.latency[index as usize];
        let mut offset = delay_offset(aligned.saturating_sub(latency), factor);
        if offset > DELAY_MAX {
            error!("{}: alignment needs delay {} > {}", tile, offset, DELAY_MAX);
            offset = DELAY_MAX;
            status |= ErrorMask::DELAY_OVERFLOW;
        }
        for channel in 0..CHANNELS {
            conv.modify(Block::channel(tile, channel), regs::DELAY_CTRL, regs::DELAY_VAL_M, offset);
        }
        config.latency[index as usize] = saturate(latency as i64 + offset as i64 * factor as i64);
        config.offset[index as usize] = offset;
        info!("  {}: latency {}, delay {}", tile, config.latency[index as usize], offset);

        sysref::capture(conv, tile, CapturePoint::T1, config.sysref_enable, false);
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::{ConverterKind::{Adc, Dac}, Tile, TileSet};
    use marker::MarkerSample;
    use sim::Sim;

    fn markers(samples: &[(u8, u32, u32)]) -> Markers {
        let mut markers = Markers::default();
        for &(index, count, loc) in samples {
            markers.set(index, MarkerSample { count: count, loc: loc });
        }
        markers
    }

    fn config(bits: u8) -> SyncConfig {
        let mut config = SyncConfig::new(0, None, None);
        config.tiles = TileSet::from_bits(bits);
        config
    }

    fn delays(sim: &Sim, kind: ConverterKind, index: u8) -> Vec<u32> {
        (0..CHANNELS)
            .map(|ch| sim.stored(Block::channel(Tile::new(kind, index), ch), regs::DELAY_CTRL))
            .collect()
    }

    #[test]
    fn offset_steps_once_per_factor() {
        for factor in 1..9 {
            for delta in 0..200 {
                let offset = delay_offset(delta, factor);
                assert_eq!(delay_offset(delta + factor as i32, factor), offset + 1);
                let next = delay_offset(delta + 1, factor);
                assert!(next == offset || next == offset + 1);
            }
        }
    }

    #[test]
    fn offset_rounds_up_past_half() {
        assert_eq!(delay_offset(6, 4), 1);
        assert_eq!(delay_offset(7, 4), 2);
        assert_eq!(delay_offset(4, 3), 1);
        assert_eq!(delay_offset(5, 3), 2);
        assert_eq!(delay_offset(-5, 2), 0);
    }

    #[test]
    fn aligns_to_slowest_tile() {
        let mut sim = Sim::new();
        sim.set_factor(Adc, 0, 2, (4, 4));
        let mut config = config(0b0011);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 1), (1, 10, 3)]))
        };
        assert_eq!(status, ErrorMask::SYSREF_FREQ_NOT_DONE);
        assert_eq!(config.aligned_target, Some(86));
        assert_eq!(&config.latency[..2], &[86, 86]);
        assert_eq!(&config.offset[..2], &[2, 0]);
        assert_eq!(delays(&sim, Adc, 0), vec![2; 4]);
        assert_eq!(delays(&sim, Adc, 1), vec![0; 4]);
        let srcap = sim.stored(Block::Tile(Adc, 1), regs::SRCAP_T1);
        assert!(srcap & regs::SRCAP_T1_EN != 0);
    }

    #[test]
    fn explicit_target_below_minimum_is_raised() {
        let mut sim = Sim::new();
        sim.set_factor(Adc, 0, 2, (4, 4));
        sim.srfreq = Some(1000);
        let mut config = config(0b0011);
        config.target_latency = Some(50);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 1), (1, 10, 3)]))
        };
        assert_eq!(status, ErrorMask::TARGET_TOO_LOW);
        assert_eq!(config.aligned_target, Some(86));

        config.target_latency = Some(90);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 1), (1, 10, 3)]))
        };
        assert!(status.is_ok());
        assert_eq!(&config.offset[..2], &[4, 2]);
        assert_eq!(&config.latency[..2], &[90, 90]);
    }

    #[test]
    fn large_delay_is_clamped() {
        let mut sim = Sim::new();
        sim.set_factor(Adc, 0, 2, (4, 4));
        sim.srfreq = Some(1000);
        let mut config = config(0b0001);
        config.target_latency = Some(200);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 1)]))
        };
        assert_eq!(status, ErrorMask::DELAY_OVERFLOW);
        assert_eq!(config.offset[0], DELAY_MAX);
        assert_eq!(config.latency[0], 82 + 62);
        assert_eq!(delays(&sim, Adc, 0), vec![DELAY_MAX; 4]);
    }

    #[test]
    fn latency_unwrapped_by_sysref_period() {
        let mut sim = Sim::new();
        sim.srfreq = Some(100);
        let mut config = config(0b0011);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 0), (1, 105, 0)]))
        };
        assert!(status.is_ok());
        assert_eq!(config.aligned_target, Some(10));
        assert_eq!(&config.offset[..2], &[0, 5]);
    }

    #[test]
    fn large_sysref_period_does_not_overflow() {
        let mut sim = Sim::new();
        sim.set_factor(Adc, 0, 8, (8, 8));
        sim.srfreq = Some(0x4000_0000);
        let mut config = config(0b0011);
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 0), (1, 12, 0)]))
        };
        assert!(status.is_ok());
        assert_eq!(config.aligned_target, Some(768));
        assert_eq!(&config.offset[..2], &[16, 0]);
    }

    #[test]
    fn extreme_targets_saturate() {
        let mut sim = Sim::new();
        sim.srfreq = Some(10);
        let mut config = config(0b0001);
        config.target_latency = Some(i32::min_value());
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 0)]))
        };
        assert_eq!(status, ErrorMask::TARGET_TOO_LOW);
        assert_eq!(config.offset[0], 0);
        assert_eq!(config.aligned_target, Some(config.latency[0]));

        config.target_latency = Some(i32::max_value());
        let status = {
            let mut conv = Converter::new(&mut sim, Adc);
            align(&mut conv, &mut config, &markers(&[(0, 10, 0)]))
        };
        assert_eq!(status, ErrorMask::DELAY_OVERFLOW);
        assert_eq!(config.offset[0], DELAY_MAX);
        // shifted one period up toward the target before the delay
        assert_eq!(config.latency[0], 20 + 31);
    }

    #[test]
    fn dac_period_scaled_by_word_ratio() {
        let mut sim = Sim::new();
        sim.set_factor(Dac, 0, 1, (2, 4));
        sim.srfreq = Some(50);
        let mut config = config(0b0011);
        config.sysref_enable = false;
        let status = {
            let mut conv = Converter::new(&mut sim, Dac);
            align(&mut conv, &mut config, &markers(&[(0, 10, 0), (1, 115, 0)]))
        };
        assert!(status.is_ok());
        assert_eq!(config.aligned_target, Some(30));
        assert_eq!(&config.offset[..2], &[10, 0]);
        let srcap = sim.stored(Block::Tile(Dac, 0), regs::SRCAP_T1);
        assert_eq!(srcap & regs::SRCAP_T1_EN, 0);
    }
}
