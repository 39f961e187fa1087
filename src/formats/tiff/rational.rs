//! Rational tag values

use std::fmt;

/// A numerator/denominator pair as stored by RATIONAL and SRATIONAL fields
///
/// Fields are wide enough to hold either an unsigned or a signed 32-bit
/// component. Writing a component outside the field's 32-bit range fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: i64,
    pub denominator: i64,
}

impl Rational {
    /// Creates a new rational
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self { numerator, denominator }
    }

    /// Returns the value as a double
    ///
    /// A zero denominator yields `f64::MAX`.
    pub fn value(&self) -> f64 {
        if self.denominator == 0 {
            f64::MAX
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Reduces the fraction to lowest terms in place
    ///
    /// Signs are left as they are. A zero denominator is left untouched.
    pub fn reduce(&mut self) {
        if self.denominator == 0 {
            return;
        }
        let div = gcd(self.numerator.unsigned_abs(), self.denominator.unsigned_abs());
        if div > 1 {
            self.numerator /= div as i64;
            self.denominator /= div as i64;
        }
    }

    /// Returns a reduced copy
    pub fn reduced(mut self) -> Self {
        self.reduce();
        self
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((numerator, denominator): (i64, i64)) -> Self {
        Self::new(numerator, denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce() {
        assert_eq!(Rational::new(10, 4).reduced(), Rational::new(5, 2));
        assert_eq!(Rational::new(6, 3).reduced(), Rational::new(2, 1));
        assert_eq!(Rational::new(7, 13).reduced(), Rational::new(7, 13));
    }

    #[test]
    fn test_reduce_is_idempotent_and_preserves_value() {
        for (n, d) in [(10, 4), (100, 75), (0, 5), (-12, 8), (1_000_000, 254), (17, 1)] {
            let once = Rational::new(n, d).reduced();
            let twice = once.reduced();
            assert_eq!(once, twice);
            assert!((once.value() - Rational::new(n, d).value()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reduce_keeps_sign() {
        assert_eq!(Rational::new(-10, 4).reduced(), Rational::new(-5, 2));
        assert_eq!(Rational::new(10, -4).reduced(), Rational::new(5, -2));
    }

    #[test]
    fn test_zero_denominator() {
        let mut r = Rational::new(3, 0);
        assert_eq!(r.value(), f64::MAX);
        r.reduce();
        assert_eq!(r, Rational::new(3, 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Rational::new(72, 1).to_string(), "72/1");
    }
}
