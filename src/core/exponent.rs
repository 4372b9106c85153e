/// Interpolation exponent handed to the inference script as `--exp`.
/// The output holds `2^exp` times as many frames as the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExponent(u8);

impl FrameExponent {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn multiplier(self) -> u32 {
        1 << self.0
    }

    /// Steps to the next exponent, wrapping from MAX back to MIN.
    pub fn advance(&mut self) {
        self.0 = if self.0 < Self::MAX { self.0 + 1 } else { Self::MIN };
    }
}

impl Default for FrameExponent {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        let exp = FrameExponent::default();
        assert_eq!(exp.value(), 1);
        assert_eq!(exp.multiplier(), 2);
    }

    #[test]
    fn test_cycle_wraps_after_four() {
        let mut exp = FrameExponent::default();
        let mut seen = Vec::new();
        for _ in 0..9 {
            seen.push(exp.value());
            exp.advance();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 1, 2, 3, 4, 1]);
    }

    #[test]
    fn test_multipliers() {
        let mut exp = FrameExponent::default();
        let mut multipliers = Vec::new();
        for _ in 0..4 {
            multipliers.push(exp.multiplier());
            exp.advance();
        }
        assert_eq!(multipliers, vec![2, 4, 8, 16]);
    }
}
