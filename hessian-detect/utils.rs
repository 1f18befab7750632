/// Utility functions for the FAST segment test

/// Check if the 16-bit circular mask contains at least `min_count` consecutive
/// set bits, using rotations instead of a scan
pub fn has_consecutive_bits(mask: u16, min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }

    // a run of n bits survives n-1 rotate-and-ands
    let mut test_mask = mask;
    for i in 1..min_count {
        test_mask &= mask.rotate_left(i as u32);
        if test_mask == 0 {
            return false;
        }
    }

    test_mask != 0
}

/// Packs a circle of flags into a mask, bit `i` set when `flags[i]` is true
pub fn pack_mask(flags: &[bool; 16]) -> u16 {
    flags
        .iter()
        .enumerate()
        .fold(0u16, |mask, (i, &set)| if set { mask | (1 << i) } else { mask })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(flags: &[bool; 16], min_count: usize) -> bool {
        let mut run = 0;
        for i in 0..32 {
            if flags[i % 16] {
                run += 1;
                if run >= min_count {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }

    #[test]
    fn test_consecutive_simple() {
        let mut flags = [false; 16];
        for f in flags.iter_mut().take(9) {
            *f = true;
        }
        assert!(has_consecutive_bits(pack_mask(&flags), 9));
        assert!(!has_consecutive_bits(pack_mask(&flags), 10));
    }

    #[test]
    fn test_consecutive_wrap_around() {
        let mut flags = [false; 16];
        for i in (12..16).chain(0..5) {
            flags[i] = true;
        }
        assert!(has_consecutive_bits(pack_mask(&flags), 9));
    }

    #[test]
    fn test_alternating_bits() {
        assert!(!has_consecutive_bits(0b0101_0101_0101_0101, 2));
        assert!(has_consecutive_bits(0b0101_0101_0101_0101, 1));
    }

    #[test]
    fn test_matches_linear_scan() {
        for mask in (0u32..=0xFFFF).step_by(37) {
            let mut flags = [false; 16];
            for (i, f) in flags.iter_mut().enumerate() {
                *f = mask & (1 << i) != 0;
            }
            for n in 1..=16 {
                assert_eq!(has_consecutive_bits(mask as u16, n), scan(&flags, n), "mask {:016b} n {}", mask, n);
            }
        }
    }
}
