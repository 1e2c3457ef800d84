/// Event-loop time in whole milliseconds since the view was mounted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn saturating_add(self, ms: u64) -> Self {
        Millis(self.0.saturating_add(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::Millis;

    #[test]
    fn add_saturates() {
        assert_eq!(Millis(1000).saturating_add(500), Millis(1500));
        assert_eq!(Millis::ZERO.saturating_add(u64::MAX).saturating_add(1), Millis(u64::MAX));
    }
}
