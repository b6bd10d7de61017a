use crate::features::network::models::InterfaceCounters;
use crate::shared::error::PartialCollectionWarning;
use crate::shared::sample::Sample;
use chrono::{DateTime, Utc};

pub const NETWORK_BYTES_SENT: &str = "network_bytes_sent";
pub const NETWORK_BYTES_RECV: &str = "network_bytes_recv";

/// Sent/received counters per interface. An interface that cannot be shaped
/// into samples is dropped on its own.
pub fn network_samples(
    interfaces: &[InterfaceCounters],
    timestamp: DateTime<Utc>,
) -> (Vec<Sample>, Vec<PartialCollectionWarning>) {
    let mut samples = Vec::with_capacity(interfaces.len() * 2);
    let mut warnings = Vec::new();

    for interface in interfaces {
        if interface.name.is_empty() {
            warnings.push(PartialCollectionWarning::unit(
                "network",
                "<unnamed>",
                "interface has no name",
            ));
            continue;
        }

        let pair = [
            (NETWORK_BYTES_SENT, interface.bytes_sent),
            (NETWORK_BYTES_RECV, interface.bytes_recv),
        ]
        .into_iter()
        .map(|(name, bytes)| {
            Sample::builder(name)
                .timestamp(timestamp)
                .value(bytes as f64)
                .tag("interface", interface.name.as_str())
                .build()
        })
        .collect::<Result<Vec<_>, _>>();

        match pair {
            Ok(pair) => samples.extend(pair),
            Err(e) => warnings.push(PartialCollectionWarning::unit("network", interface.name.as_str(), e)),
        }
    }

    (samples, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::sample::capture_time;

    fn counters(name: &str, sent: u64, recv: u64) -> InterfaceCounters {
        InterfaceCounters {
            name: name.to_string(),
            bytes_sent: sent,
            bytes_recv: recv,
        }
    }

    #[test]
    fn two_samples_per_interface() {
        let (samples, warnings) = network_samples(
            &[counters("lo", 500, 500), counters("eth0", 1_024, 4_096)],
            capture_time(),
        );

        assert!(warnings.is_empty());
        assert_eq!(samples.len(), 4);
        let eth0_recv = samples
            .iter()
            .find(|s| s.name() == NETWORK_BYTES_RECV && s.tag("interface") == Some("eth0"))
            .unwrap();
        assert_eq!(eth0_recv.value(), 4_096.0);
    }

    #[test]
    fn unnamed_interface_is_skipped_with_warning() {
        let (samples, warnings) = network_samples(
            &[counters("", 1, 1), counters("wlan0", 10, 20)],
            capture_time(),
        );

        assert_eq!(samples.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subsystem, "network");
    }
}
