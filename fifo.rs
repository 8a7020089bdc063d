use hal::{Block, Converter, ConverterKind, Hal, TileSet, CHANNELS};
use regs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    Disabled,
    Enabled
}

/// Clears the sticky FIFO status flags of every channel of the tiles in
/// `clear`, then switches all FIFOs of the converter kind at once.
pub fn set_mode<H: Hal>(conv: &mut Converter<H>, mode: FifoMode, clear: TileSet) {
    let (ctrl, flags) = match conv.kind {
        ConverterKind::Adc => (regs::FIFO_CTRL_ADC, regs::ADC_FIFO_FLAGS),
        ConverterKind::Dac => (regs::FIFO_CTRL_DAC, regs::DAC_FIFO_FLAGS),
    };
    for index in clear.iter() {
        let tile = conv.tile(index);
        for channel in 0..CHANNELS {
            conv.write(Block::channel(tile, channel), regs::FABRIC_ISR, flags);
        }
    }
    let value = match mode {
        FifoMode::Disabled => 0,
        FifoMode::Enabled => regs::FIFO_ENABLE,
    };
    conv.write(Block::Global, ctrl, value);
}
