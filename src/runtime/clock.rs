use std::sync::Once;
use std::time::{Duration, Instant};

use tracing::warn;

static CPU_CLOCK_MISSING: Once = Once::new();

#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    wall: Instant,
    cpu: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elapsed {
    pub wall_s: f64,
    pub cpu_s: f64,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            wall: Instant::now(),
            cpu: process_cpu_time(),
        }
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed {
            wall_s: self.wall.elapsed().as_secs_f64(),
            cpu_s: cpu_between(self.cpu, process_cpu_time()),
        }
    }
}

// Process time is reported as 0 when the CPU clock cannot be read.
fn cpu_between(start: Option<Duration>, now: Option<Duration>) -> f64 {
    match (start, now) {
        (Some(start), Some(now)) => now.saturating_sub(start).as_secs_f64(),
        _ => {
            CPU_CLOCK_MISSING.call_once(|| {
                warn!("process cpu clock unavailable: process_time=0");
            });
            0.0
        }
    }
}

#[cfg(unix)]
fn process_cpu_time() -> Option<Duration> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return None;
    }
    Some(Duration::new(
        u64::try_from(ts.tv_sec).ok()?,
        u32::try_from(ts.tv_nsec).ok()?,
    ))
}

#[cfg(not(unix))]
fn process_cpu_time() -> Option<Duration> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_non_negative_and_monotonic() {
        let watch = Stopwatch::start();
        let mut acc = 0u64;
        for i in 0..200_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        assert!(acc > 0);
        let first = watch.elapsed();
        let second = watch.elapsed();
        assert!(first.wall_s >= 0.0 && first.cpu_s >= 0.0);
        assert!(second.wall_s >= first.wall_s);
    }

    #[test]
    fn missing_cpu_clock_reports_zero() {
        assert_eq!(cpu_between(None, Some(Duration::from_secs(3))), 0.0);
        assert_eq!(cpu_between(Some(Duration::from_secs(1)), None), 0.0);
        assert_eq!(
            cpu_between(
                Some(Duration::from_millis(500)),
                Some(Duration::from_millis(1250))
            ),
            0.75
        );
    }
}
