#![allow(dead_code)]

// Global control block (Block::Global)

pub const SRCOUNT_CTRL                     : u16 = 0x004;
pub const SRCOUNT_START_ADC                : u32 = 1 << 0;
pub const SRCOUNT_START_DAC                : u32 = 1 << 1;

pub const SRCOUNT_VAL                      : u16 = 0x008;
pub const SRCOUNT_M                        : u32 = 0xff;
pub const SRCOUNT_ADC_S                    : u32 = 0;
pub const SRCOUNT_DAC_S                    : u32 = 8;

pub const SRFREQ_VAL                       : u16 = 0x00c;
pub const SRFREQ_DONE                      : u32 = 1 << 0;
pub const SRFREQ_VAL_S                     : u32 = 1;
pub const SRFREQ_VAL_M                     : u32 = 0x7fff_ffff << SRFREQ_VAL_S;

pub const FIFO_CTRL_ADC                    : u16 = 0x010;
pub const FIFO_CTRL_DAC                    : u16 = 0x014;
pub const FIFO_ENABLE                      : u32 = 1 << 0;

pub const ADC_MARKER_RST                   : u16 = 0x018;

pub const DAC_MARKER_CTRL                  : u16 = 0x01c;

pub const SRCAP_TRX                        : u16 = 0x030;
pub const SRCAP_EN_TRX                     : u32 = 1 << 0;

// Tile common block (Block::Tile)

pub const CLKSTAT                          : u16 = 0x008;
pub const PLLEN                            : u32 = 1 << 0;

pub const SRCAP_PLL                        : u16 = 0x00c;
pub const SRCAP_PLL_EN                     : u32 = 1 << 8;
pub const SRCLR_PLL                        : u32 = 1 << 9;

pub const SRCAP_T1                         : u16 = 0x010;
pub const SRCAP_T1_INIT_M                  : u32 = 0x7 << 7;
pub const SRCAP_T1_RST                     : u32 = 1 << 11;
pub const SRCAP_T1_EN                      : u32 = 1 << 12;
pub const SRCLR_T1                         : u32 = 1 << 13;

// DTC code field, shared layout between SRCAP_PLL and SRCAP_T1
pub const SRDTC_M                          : u32 = 0x7f;

pub const SRCAP_DIG                        : u16 = 0x02c;
pub const SRCAP_DIG_RST                    : u32 = 1 << 8;

pub const SRFLAG                           : u16 = 0x084;
pub const SRFLAG_T1_S                      : u32 = 0;
pub const SRFLAG_PLL_S                     : u32 = 2;
pub const SRFLAG_M                         : u32 = 0x3;

pub const SRDIST                           : u16 = 0x08c;

// Channel block (Block::Channel)

pub const ADC_MARKER                       : u16 = 0x100;
pub const AMARK_CNT_M                      : u32 = 0xff;
pub const AMARK_LOC_S                      : u32 = 16;
pub const AMARK_LOC_M                      : u32 = 0xf << AMARK_LOC_S;
pub const AMARK_DONE                       : u32 = 1 << 31;

pub const DAC_MARKER_CNT                   : u16 = 0x104;
pub const DMARK_CNT_M                      : u32 = 0xff;

pub const DAC_MARKER_LOC                   : u16 = 0x108;
pub const DMARK_LOC_M                      : u32 = 0xf;

pub const DELAY_CTRL                       : u16 = 0x110;
pub const DELAY_VAL_M                      : u32 = 0x1f;

pub const FABRIC_ISR                       : u16 = 0x200;
pub const ADC_FIFO_FLAGS                   : u32 = 0x000f;
pub const DAC_FIFO_FLAGS                   : u32 = 0x003f;

// SYSREF routing words, indexed by tile
pub const SRDIST_DAC2                      : [(u8, u32); 2] = [(0, 0xc980), (1, 0x0100)];
pub const SRDIST_DAC2_ADC3                 : u32 = 0x1700;
pub const SRDIST_DAC4                      : [(u8, u32); 4] = [(0, 0xca80), (1, 0x2400), (2, 0x0980), (3, 0x0100)];
pub const SRDIST_DAC4_ADC3                 : u32 = 0x0700;
pub const SRDIST_ADC                       : [(u8, u32); 3] = [(0, 0x0280), (1, 0x0600), (2, 0x8880)];
