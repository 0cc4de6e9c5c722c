//! Host vitals sampler for the header bar.

use std::time::Duration;

use sysinfo::System;
use tokio::sync::mpsc::UnboundedSender;

use crate::message::{HostSample, Msg};

const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

pub fn spawn_sampler(tx: UnboundedSender<Msg>) {
    tokio::spawn(async move {
        let mut system = System::new();
        let hostname = System::host_name().unwrap_or_else(|| "localhost".to_string());
        let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
        // The first tick fires immediately; CPU deltas need a warmup refresh.
        interval.tick().await;
        system.refresh_cpu_all();

        loop {
            interval.tick().await;
            system.refresh_cpu_all();
            system.refresh_memory();
            let sample = HostSample {
                hostname: hostname.clone(),
                cpu_pct: system.global_cpu_usage(),
                mem_used: system.used_memory(),
                mem_total: system.total_memory(),
                load_one: System::load_average().one,
            };
            if tx.send(Msg::Host(sample)).is_err() {
                break;
            }
        }
    });
}

/// "1.5G/7.6G" style memory display.
pub fn format_bytes(bytes: u64) -> String {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1}G", b / GIB)
    } else {
        format!("{:.0}M", b / MIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes() {
        assert_eq!(format_bytes(512 * 1024 * 1024), "512M");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5G");
    }
}
