//! Registry statistics for monitoring and debugging.

/// Statistics for query registry operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of handles registered.
    registrations: u64,
    /// Number of handles pushed out by newer ones.
    evictions: u64,
    /// Number of handles released in bulk.
    releases: u64,
}

impl RegistryStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a registration.
    #[inline]
    pub fn record_registration(&mut self) {
        self.registrations += 1;
    }

    /// Records an eviction.
    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records handles released in bulk.
    #[inline]
    pub fn record_releases(&mut self, count: u64) {
        self.releases += count;
    }

    /// Returns registrations.
    pub fn registrations(&self) -> u64 {
        self.registrations
    }

    /// Returns evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Returns bulk releases.
    pub fn releases(&self) -> u64 {
        self.releases
    }
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RegistryStats {{ registrations: {}, evictions: {}, releases: {} }}",
            self.registrations, self.evictions, self.releases
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stats() {
        let mut stats = RegistryStats::new();
        for _ in 0..4 {
            stats.record_registration();
        }
        stats.record_eviction();
        stats.record_releases(3);

        assert_eq!(stats.registrations(), 4);
        assert_eq!(stats.evictions(), 1);
        assert_eq!(stats.releases(), 3);
    }

    #[test]
    fn test_display() {
        let mut stats = RegistryStats::new();
        stats.record_registration();
        assert_eq!(
            stats.to_string(),
            "RegistryStats { registrations: 1, evictions: 0, releases: 0 }"
        );
    }
}
