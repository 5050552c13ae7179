use rand::rngs::StdRng;
use rand::SeedableRng;

/// Helper option to create a rng from a variety of options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum RngSource {
    /// Build a new rng from the system.
    #[default]
    Default,

    /// The rng is passed as a seed.
    Seed(u64),

    /// The rng is passed as an option.
    Rng(StdRng),
}

impl From<RngSource> for StdRng {
    fn from(source: RngSource) -> Self {
        match source {
            RngSource::Default => StdRng::from_os_rng(),
            RngSource::Rng(rng) => rng,
            RngSource::Seed(seed) => StdRng::seed_from_u64(seed),
        }
    }
}

impl From<u64> for RngSource {
    fn from(seed: u64) -> Self {
        Self::Seed(seed)
    }
}

impl From<Option<u64>> for RngSource {
    fn from(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::Seed(seed),
            None => Self::Default,
        }
    }
}

impl From<StdRng> for RngSource {
    fn from(rng: StdRng) -> Self {
        Self::Rng(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a: StdRng = RngSource::from(7u64).into();
        let mut b: StdRng = RngSource::from(Some(7u64)).into();

        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn missing_seed_falls_back_to_system() {
        assert_eq!(RngSource::from(None), RngSource::Default);
    }
}
