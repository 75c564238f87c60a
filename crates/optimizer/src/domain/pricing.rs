#![forbid(unsafe_code)]

/// Unit prices of the target function, derived once per run from the
/// provider's price catalog and cached for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingUnits {
    /// USD per GB-second of compute.
    pub compute_usd_per_gb_second: f64,
    /// USD per request.
    pub request_usd: f64,
}

impl PricingUnits {
    /// Price of one invocation at `memory_mb` billed for `duration_ms`.
    ///
    /// The provider bills at 1 ms granularity, so the duration is rounded
    /// up before conversion to seconds.
    pub fn invocation_usd(&self, memory_mb: u32, duration_ms: f64) -> f64 {
        let allocated_gb = f64::from(memory_mb) / 1024.0;
        let compute_seconds = duration_ms.ceil() / 1000.0;
        self.request_usd + self.compute_usd_per_gb_second * allocated_gb * compute_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_price_rounds_duration_up() {
        let units = PricingUnits {
            compute_usd_per_gb_second: 0.0000166667,
            request_usd: 0.0000002,
        };

        // 1769 MB for 100 ms: (1769/1024) GB * 0.1 s.
        let price = units.invocation_usd(1769, 100.0);
        let expected = 0.0000002 + 0.0000166667 * (1769.0 / 1024.0) * 0.1;
        assert!((price - expected).abs() < 1e-12);

        // A fractional duration is billed as the next full millisecond.
        assert_eq!(
            units.invocation_usd(1024, 100.2),
            units.invocation_usd(1024, 101.0)
        );
    }

    proptest::proptest! {
        #[test]
        fn price_is_monotone_in_memory_and_duration(
            memory_mb in 128u32..=3008,
            duration_ms in 1.0f64..900_000.0,
        ) {
            let units = PricingUnits {
                compute_usd_per_gb_second: 0.0000166667,
                request_usd: 0.0000002,
            };
            let price = units.invocation_usd(memory_mb, duration_ms);
            proptest::prop_assert!(price > units.request_usd);
            proptest::prop_assert!(price <= units.invocation_usd(memory_mb + 1, duration_ms));
            proptest::prop_assert!(price <= units.invocation_usd(memory_mb, duration_ms + 1.0));
        }
    }
}
