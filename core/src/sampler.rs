//! Background memory sampling.
//!
//! The sampler thread owns its watermark until it is joined; the
//! coordinator only sees the MemorySample returned by `cancel()`.
//! Cancellation is checked between samples, never during one.

use crate::error::{BenchError, BenchResult};
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Source of "memory in use right now" readings.
pub trait MemoryProbe {
    /// Bytes in use, or None when the reading is unavailable.
    fn used_bytes(&mut self) -> Option<u64>;
}

/// Resident memory of the current process, via sysinfo.
pub struct ProcessMemoryProbe {
    pid:    Pid,
    system: System,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        Self {
            pid:    Pid::from_u32(std::process::id()),
            system: System::new(),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::new().with_memory(),
        );
        self.system.process(self.pid).map(|p| p.memory())
    }
}

/// Running min/max of sampled memory, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemorySample {
    pub min:     u64,
    pub max:     u64,
    pub samples: u64,
}

impl MemorySample {
    pub fn record(&mut self, used: u64) {
        if self.samples == 0 {
            self.min = used;
            self.max = used;
        } else {
            self.min = self.min.min(used);
            self.max = self.max.max(used);
        }
        self.samples += 1;
    }

    pub fn min_kb(&self) -> u64 {
        self.min / 1024
    }

    pub fn max_kb(&self) -> u64 {
        self.max / 1024
    }
}

pub struct ResourceSampler;

impl ResourceSampler {
    /// Start sampling `probe` every `interval` on a dedicated thread.
    pub fn spawn<P>(mut probe: P, interval: Duration) -> BenchResult<SamplerHandle>
    where
        P: MemoryProbe + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = "resource-sampler".to_string();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut watermark = MemorySample::default();
                loop {
                    if let Some(used) = probe.used_bytes() {
                        watermark.record(used);
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // A stop message or a dropped handle both end the loop.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                watermark
            })
            .map_err(|source| BenchError::WorkerSpawn { name, source })?;
        Ok(SamplerHandle { stop: stop_tx, thread })
    }
}

pub struct SamplerHandle {
    stop:   Sender<()>,
    thread: JoinHandle<MemorySample>,
}

impl SamplerHandle {
    /// Signal the sampler to stop and wait for its final watermark.
    pub fn cancel(self) -> MemorySample {
        let _ = self.stop.send(());
        match self.thread.join() {
            Ok(sample) => sample,
            Err(_) => {
                log::warn!("resource sampler panicked; memory figures unavailable");
                MemorySample::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Replays a fixed series, then repeats its last value.
    struct ScriptedProbe {
        readings: Vec<Option<u64>>,
        next:     usize,
    }

    impl MemoryProbe for ScriptedProbe {
        fn used_bytes(&mut self) -> Option<u64> {
            let idx = self.next.min(self.readings.len() - 1);
            self.next += 1;
            self.readings[idx]
        }
    }

    #[test]
    fn watermark_tracks_min_and_max() {
        let mut sample = MemorySample::default();
        for used in [4096, 1024, 8192, 2048] {
            sample.record(used);
        }
        assert_eq!(sample.min, 1024);
        assert_eq!(sample.max, 8192);
        assert_eq!(sample.samples, 4);
        assert_eq!(sample.max_kb(), 8);
    }

    #[test]
    fn sampler_records_until_cancelled() {
        let probe = ScriptedProbe {
            readings: vec![Some(5_000), None, Some(3_000), Some(9_000)],
            next:     0,
        };
        let handle = ResourceSampler::spawn(probe, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(50));
        let sample = handle.cancel();
        assert!(sample.samples >= 3, "expected several samples, got {}", sample.samples);
        assert_eq!(sample.min, 3_000);
        assert_eq!(sample.max, 9_000);
    }

    #[test]
    fn cancel_does_not_wait_out_the_interval() {
        let probe = ScriptedProbe { readings: vec![Some(1)], next: 0 };
        let handle = ResourceSampler::spawn(probe, Duration::from_secs(60)).unwrap();
        let started = Instant::now();
        let sample = handle.cancel();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(sample.samples, 1);
    }

    #[test]
    fn process_probe_reports_memory() {
        let mut probe = ProcessMemoryProbe::new();
        let used = probe.used_bytes().expect("current process is visible");
        assert!(used > 0);
    }
}
