//! Fixed-interval sampling of the public endpoint.
//!
//! The loop ends on the wall-clock deadline or on cancellation, whichever
//! comes first, regardless of how many samples were collected. A probe still
//! in flight at that point is abandoned.

use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::harness::probe::{Probe, VerificationSample};
use crate::routing::PoolId;

/// Samples in collection order plus running tallies.
#[derive(Debug, Clone)]
pub struct SampleLog {
    backup: PoolId,
    samples: Vec<VerificationSample>,
    total: u64,
    non2xx: u64,
    backup_count: u64,
    cancelled: bool,
}

impl SampleLog {
    pub fn new(backup: PoolId) -> Self {
        Self {
            backup,
            samples: Vec::new(),
            total: 0,
            non2xx: 0,
            backup_count: 0,
            cancelled: false,
        }
    }

    pub fn push(&mut self, sample: VerificationSample) {
        debug_assert!(
            self.samples
                .last()
                .map_or(true, |last| last.offset_ms < sample.offset_ms),
            "sample offsets must be strictly increasing"
        );
        self.total += 1;
        if !sample.observation.is_ok() {
            self.non2xx += 1;
        }
        if sample.observation.served_by(self.backup.as_str()) {
            self.backup_count += 1;
        }
        self.samples.push(sample);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Samples whose status was anything other than 200, including those
    /// with no response at all.
    pub fn non2xx(&self) -> u64 {
        self.non2xx
    }

    pub fn backup_count(&self) -> u64 {
        self.backup_count
    }

    /// Percentage of samples served by the backup pool.
    pub fn backup_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.backup_count as f64 / self.total as f64
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn samples(&self) -> &[VerificationSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<VerificationSample> {
        self.samples
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    pub duration: Duration,
    pub interval: Duration,
}

impl Sampler {
    /// Probe every `interval` until `duration` has elapsed. `on_sample` sees
    /// each sample as it is recorded. A zero interval is treated as 1ms.
    pub async fn run<P, F>(
        &self,
        probe: &P,
        backup: PoolId,
        cancel: &CancellationToken,
        mut on_sample: F,
    ) -> SampleLog
    where
        P: Probe,
        F: FnMut(&VerificationSample),
    {
        let mut log = SampleLog::new(backup);
        let start = Instant::now();
        let deadline = start + self.duration;

        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log.cancelled = true;
                    break;
                }
                _ = time::sleep_until(deadline) => break,
                _ = ticker.tick() => {}
            }

            let offset = start.elapsed();
            if offset >= self.duration {
                break;
            }
            let offset_ms = offset.as_millis() as u64;
            if log.samples.last().is_some_and(|last| offset_ms <= last.offset_ms) {
                continue;
            }

            let observation = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log.cancelled = true;
                    break;
                }
                _ = time::sleep_until(deadline) => {
                    tracing::debug!("Sampling deadline reached with a probe in flight");
                    break;
                }
                observation = probe.observe() => observation,
            };

            let sample = VerificationSample {
                seq: log.total,
                offset_ms,
                observation,
            };
            on_sample(&sample);
            log.push(sample);
        }

        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::probe::Observation;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedProbe {
        pool: &'static str,
        delay: Duration,
        calls: AtomicU64,
    }

    impl FixedProbe {
        fn new(pool: &'static str, delay: Duration) -> Self {
            Self {
                pool,
                delay,
                calls: AtomicU64::new(0),
            }
        }
    }

    impl Probe for FixedProbe {
        async fn observe(&self) -> Observation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            Observation {
                status: Some(200),
                pool: Some(self.pool.to_string()),
                ..Observation::default()
            }
        }
    }

    fn sampler(duration_ms: u64, interval_ms: u64) -> Sampler {
        Sampler {
            duration: Duration::from_millis(duration_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[tokio::test]
    async fn samples_at_interval_until_deadline() {
        let probe = FixedProbe::new("green", Duration::ZERO);
        let mut seen = 0;
        let started = std::time::Instant::now();

        let log = sampler(500, 100)
            .run(&probe, PoolId::Green, &CancellationToken::new(), |_| seen += 1)
            .await;

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!((3..=6).contains(&log.total()), "total = {}", log.total());
        assert_eq!(seen, log.total());
        assert_eq!(log.backup_count(), log.total());
        assert_eq!(log.non2xx(), 0);
        assert!(!log.cancelled());

        let offsets: Vec<u64> = log.samples().iter().map(|s| s.offset_ms).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert!(offsets.iter().all(|&o| o < 500));
        let seqs: Vec<u64> = log.samples().iter().map(|s| s.seq).collect();
        assert_eq!(seqs, (0..log.total()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn hung_probe_is_abandoned_at_deadline() {
        let probe = FixedProbe::new("green", Duration::from_secs(30));
        let started = std::time::Instant::now();

        let log = sampler(200, 50)
            .run(&probe, PoolId::Green, &CancellationToken::new(), |_| {})
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(log.total(), 0);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_sampling() {
        let probe = FixedProbe::new("blue", Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let log = sampler(10_000, 100)
            .run(&probe, PoolId::Green, &cancel, |_| {})
            .await;

        assert!(log.cancelled());
        assert_eq!(log.total(), 0);
    }

    #[tokio::test]
    async fn zero_interval_still_yields_increasing_offsets() {
        let green = FixedProbe::new("green", Duration::ZERO);

        let log = sampler(50, 0)
            .run(&green, PoolId::Green, &CancellationToken::new(), |_| {})
            .await;

        assert!(log.total() > 0);
        let offsets: Vec<u64> = log.samples().iter().map(|s| s.offset_ms).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]), "offsets = {offsets:?}");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "strictly increasing")]
    fn repeated_offset_is_rejected() {
        let mut log = SampleLog::new(PoolId::Green);
        for seq in 0..2 {
            log.push(VerificationSample {
                seq,
                offset_ms: 150,
                observation: Observation::default(),
            });
        }
    }

    #[test]
    fn tallies_follow_samples() {
        let mut log = SampleLog::new(PoolId::Green);
        let statuses = [(Some(200), "blue"), (Some(502), "green"), (None, "-"), (Some(200), "green")];
        for (i, (status, pool)) in statuses.into_iter().enumerate() {
            log.push(VerificationSample {
                seq: i as u64,
                offset_ms: i as u64 * 150,
                observation: Observation {
                    status,
                    pool: Some(pool.to_string()),
                    ..Observation::default()
                },
            });
        }
        assert_eq!(log.total(), 4);
        assert_eq!(log.non2xx(), 2);
        assert_eq!(log.backup_count(), 2);
        assert!((log.backup_ratio() - 50.0).abs() < f64::EPSILON);
    }
}
