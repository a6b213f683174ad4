use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Exact ratio `num / den` clamped to `[0, 1]`. A zero denominator is
/// treated as fully satisfied. Operands beyond the `i32` range are scaled
/// down together first, which keeps the ratio within one part in 2^30.
#[inline]
pub fn clamped_ratio(mut num: u64, mut den: u64) -> Fixed64 {
    if num >= den {
        return Fixed64::ONE;
    }
    while den > i32::MAX as u64 {
        num >>= 1;
        den >>= 1;
    }
    Fixed64::from_num(num) / Fixed64::from_num(den)
}

/// Map a `[0, 1]` ratio onto a whole percentage, rounding down.
#[inline]
pub fn to_percent_byte(v: Fixed64) -> u8 {
    let pct = (v * Fixed64::from_num(100)).floor();
    pct.clamp(Fixed64::ZERO, Fixed64::from_num(100)).to_num::<u8>()
}
