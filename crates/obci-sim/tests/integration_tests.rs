//! Integration tests for the board simulator
//!
//! These tests verify end-to-end behavior of the simulator including:
//! - Command sequences a host driver sends while connecting
//! - The time-sync handshake against the sample stream
//! - Output fragmentation and overflow handling
//! - The async handle driving the simulator on tokio time

use std::time::Duration;

use obci_protocol::packet::{Packet, PacketCodec, PACKET_SIZE};
use obci_protocol::responses;
use obci_protocol::{FirmwareVersion, PacketVariant, ProtocolCodec};
use obci_sim::{
    Fragmentation, OutputBuffer, Simulator, SimulatorConfig, SimulatorEvent, SimulatorHandle,
    BOOT_DELAY,
};
use tokio::time::Instant;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Create a simulator and run it through boot; returns it with the open time
    pub fn booted(config: SimulatorConfig) -> (Simulator, Instant) {
        let start = Instant::now();
        let mut sim = Simulator::new("OpenBCISimulator", config);
        sim.open(start).unwrap();
        let now = start + BOOT_DELAY;
        sim.fire_due(now);
        assert_eq!(sim.take_event(), Some(SimulatorEvent::Opened));
        (sim, now)
    }

    pub fn v2() -> SimulatorConfig {
        SimulatorConfig {
            firmware_version: FirmwareVersion::V2,
            ..Default::default()
        }
    }

    /// Payloads of all pending data events
    pub fn fragments(sim: &mut Simulator) -> Vec<Vec<u8>> {
        sim.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SimulatorEvent::Data(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    /// All pending data concatenated
    pub fn output(sim: &mut Simulator) -> Vec<u8> {
        fragments(sim).concat()
    }

    pub fn packets(bytes: &[u8]) -> Vec<Packet> {
        let mut codec = PacketCodec::new();
        codec.push_bytes(bytes);
        std::iter::from_fn(|| codec.next_command()).collect()
    }

    pub fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }
}

use helpers::*;

// ============================================================================
// Connect Sequence Tests
// ============================================================================

mod connect_tests {
    use super::*;

    #[test]
    fn test_v2_soft_reset_daisy_attach_register_query() {
        let (mut sim, now) = booted(v2());

        sim.write(b"v", now).unwrap();
        let id = String::from_utf8(output(&mut sim)).unwrap();
        assert_eq!(
            id,
            "OpenBCI V3 Simulator On Board ADS1299 Device ID: 0x3E  LIS3DH Device ID: 0x38422 Firmware: v2.0.0\n$$$"
        );

        sim.write(b"C", now).unwrap();
        assert_eq!(output(&mut sim), b"daisy attached16$$$".to_vec());

        sim.write(b"?", now).unwrap();
        let mut expected = responses::register_query(true, FirmwareVersion::V2).into_bytes();
        expected.extend_from_slice(b"$$$");
        let dump = output(&mut sim);
        assert_eq!(dump, expected);

        let text = String::from_utf8(dump).unwrap();
        assert!(text.contains("Daisy ADS Registers"));
        assert!(text.contains("0x0F.33"));
    }

    #[test]
    fn test_soft_reset_after_daisy_attach_mentions_daisy() {
        let (mut sim, now) = booted(SimulatorConfig::default());
        sim.write(b"C", now).unwrap();
        output(&mut sim);

        sim.write(b"v", now).unwrap();
        let id = String::from_utf8(output(&mut sim)).unwrap();
        assert!(id.contains("On Daisy ADS1299 Device ID: 0x3E\n"));
        assert!(!id.contains("Firmware"));
    }

    #[test]
    fn test_v3_register_query_layout() {
        let config = SimulatorConfig {
            firmware_version: FirmwareVersion::V3,
            ..Default::default()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"?", now).unwrap();
        let text = String::from_utf8(output(&mut sim)).unwrap();
        assert!(text.contains("0x0F 33"));
        assert!(!text.contains("Daisy ADS Registers"));
    }

    #[test]
    fn test_unknown_commands_are_ignored() {
        let (mut sim, now) = booted(v2());
        for byte in [b'x', b'Z', 0x00, 0xFF] {
            sim.write(&[byte], now).unwrap();
        }
        sim.write(&[], now).unwrap();
        assert!(sim.drain_events().is_empty());
    }
}

// ============================================================================
// Radio Tests
// ============================================================================

mod radio_tests {
    use super::*;

    #[test]
    fn test_set_channel_out_of_range() {
        let (mut sim, now) = booted(v2());
        sim.write(&[0xF0, 0x01, 30], now).unwrap();
        assert_eq!(
            output(&mut sim),
            b"Failure: Verify channel number is less than 25$$$".to_vec()
        );
        assert_eq!(sim.snapshot().channel_number, 1);
    }

    #[test]
    fn test_override_then_get_channel_reports_failure() {
        let (mut sim, now) = booted(v2());
        sim.write(&[0xF0, 0x02, 4], now).unwrap();
        output(&mut sim);

        sim.write(&[0xF0, 0x00], now).unwrap();
        assert_eq!(
            output(&mut sim),
            b"Failure: Host on Channel Number 4\x04$$$".to_vec()
        );
        sim.write(&[0xF0, 0x07], now).unwrap();
        assert_eq!(output(&mut sim), b"Failure: System is Down$$$".to_vec());
    }

    #[test]
    fn test_serial_port_failure_is_silent() {
        let config = SimulatorConfig {
            board_failure: true,
            serial_port_failure: true,
            ..v2()
        };
        let (mut sim, now) = booted(config);
        sim.write(&[0xF0, 0x00], now).unwrap();
        sim.write(&[0xF0, 0x01, 3], now).unwrap();
        sim.write(&[0xF0, 0x03], now).unwrap();
        sim.write(&[0xF0, 0x04, 100], now).unwrap();
        assert!(output(&mut sim).is_empty());
        assert_eq!(sim.snapshot().poll_time_ms, 80);
    }
}

// ============================================================================
// Streaming and Sync Tests
// ============================================================================

mod streaming_tests {
    use super::*;

    #[test]
    fn test_start_then_stop_within_one_period() {
        let (mut sim, now) = booted(SimulatorConfig::default());
        sim.write(b"b", now).unwrap();
        sim.fire_due(now + ms(2));
        sim.write(b"s", now + ms(2)).unwrap();
        sim.fire_due(now + ms(1000));

        assert!(output(&mut sim).len() <= PACKET_SIZE);
        assert!(!sim.is_streaming());
    }

    #[test]
    fn test_stream_restarts_after_stop() {
        let (mut sim, now) = booted(SimulatorConfig::default());
        sim.write(b"b", now).unwrap();
        sim.fire_due(now + ms(8));
        sim.write(b"s", now + ms(8)).unwrap();
        sim.write(b"b", now + ms(20)).unwrap();
        sim.fire_due(now + ms(24));

        let numbers: Vec<u8> = packets(&output(&mut sim))
            .iter()
            .map(|p| p.sample_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn test_sync_marks_third_packet() {
        let (mut sim, now) = booted(v2());
        sim.write(b"b", now).unwrap();
        sim.write(b"<", now).unwrap();
        sim.fire_due(now + ms(24));

        let out = output(&mut sim);
        assert!(out.contains(&b','));

        let variants: Vec<PacketVariant> = packets(&out).iter().map(|p| p.variant).collect();
        assert_eq!(
            variants,
            vec![
                PacketVariant::AccelSynced,
                PacketVariant::AccelSynced,
                PacketVariant::AccelSyncSet,
                PacketVariant::AccelSynced,
                PacketVariant::AccelSynced,
                PacketVariant::AccelSynced,
            ]
        );
        assert!(packets(&out).iter().all(|p| p.timestamp.is_some()));
    }

    #[test]
    fn test_sync_ack_lands_between_second_and_third_packet() {
        let (mut sim, now) = booted(v2());
        sim.write(b"b", now).unwrap();
        sim.write(b"<", now).unwrap();
        sim.fire_due(now + ms(12));

        let fragments = fragments(&mut sim);
        assert_eq!(fragments.len(), 4);
        assert_eq!(fragments[2], b",".to_vec());
    }

    #[test]
    fn test_sync_without_accel_uses_raw_aux_variants() {
        let config = SimulatorConfig {
            accel: false,
            ..v2()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"b", now).unwrap();
        sim.write(b"<", now).unwrap();
        sim.fire_due(now + ms(16));

        let variants: Vec<PacketVariant> =
            packets(&output(&mut sim)).iter().map(|p| p.variant).collect();
        assert_eq!(
            variants,
            vec![
                PacketVariant::RawAuxSynced,
                PacketVariant::RawAuxSynced,
                PacketVariant::RawAuxSyncSet,
                PacketVariant::RawAuxSynced,
            ]
        );
    }

    #[test]
    fn test_sync_ignored_on_non_v2() {
        for firmware in [FirmwareVersion::V1, FirmwareVersion::V3] {
            let config = SimulatorConfig {
                firmware_version: firmware,
                ..Default::default()
            };
            let (mut sim, now) = booted(config);
            let before = sim.snapshot();
            sim.write(b"<", now).unwrap();
            sim.fire_due(now + ms(100));

            assert_eq!(sim.snapshot(), before);
            assert!(output(&mut sim).is_empty());
        }
    }

    #[test]
    fn test_fast_sample_rate_is_capped() {
        let config = SimulatorConfig {
            sample_rate_hz: 16_000,
            ..Default::default()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"b", now).unwrap();
        sim.fire_due(now + ms(20));
        assert_eq!(packets(&output(&mut sim)).len(), 10);
    }
}

// ============================================================================
// Fragmentation Tests
// ============================================================================

mod fragmentation_tests {
    use super::*;

    #[test]
    fn test_one_by_one() {
        let config = SimulatorConfig {
            fragmentation: Fragmentation::OneByOne,
            ..Default::default()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"v", now).unwrap();
        sim.fire_due(now);

        let fragments = fragments(&mut sim);
        assert!(fragments.iter().all(|f| f.len() == 1));

        let mut expected = responses::identification(false, FirmwareVersion::V1).into_bytes();
        expected.extend_from_slice(b"$$$");
        assert_eq!(fragments.concat(), expected);
    }

    #[test]
    fn test_none_emits_each_write_whole() {
        let (mut sim, now) = booted(SimulatorConfig::default());
        sim.write(b"C", now).unwrap();
        assert_eq!(
            fragments(&mut sim),
            vec![b"daisy attached16".to_vec(), b"$$$".to_vec()]
        );
    }

    #[test]
    fn test_full_buffers_coalesces_within_latency() {
        let config = SimulatorConfig {
            fragmentation: Fragmentation::FullBuffers,
            latency_time_ms: 10,
            ..Default::default()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"C", now).unwrap();
        sim.write(b"c", now + ms(5)).unwrap();
        sim.fire_due(now + ms(10));

        assert_eq!(
            fragments(&mut sim),
            vec![b"daisy attached16$$$daisy removed$$$".to_vec()]
        );
    }

    #[test]
    fn test_overflow_drains_during_write() {
        let config = SimulatorConfig {
            fragmentation: Fragmentation::FullBuffers,
            buffer_capacity_bytes: 64,
            ..Default::default()
        };
        let (mut sim, now) = booted(config);
        sim.write(b"?", now).unwrap();
        assert!(sim.snapshot().bytes_queued <= 64);

        let mut out = output(&mut sim);
        assert!(!out.is_empty());
        sim.fire_due(now + ms(1000));
        out.extend(output(&mut sim));

        let mut expected = responses::register_query(false, FirmwareVersion::V1).into_bytes();
        expected.extend_from_slice(b"$$$");
        assert_eq!(out, expected);
    }
}

// ============================================================================
// Async Handle Tests
// ============================================================================

mod handle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sync_through_handle() {
        let (handle, mut events) = SimulatorHandle::spawn("OpenBCISimulator", v2());
        assert_eq!(events.recv().await, Some(SimulatorEvent::Opened));

        handle.write(b"b".to_vec()).await.unwrap();
        handle.write(b"<".to_vec()).await.unwrap();
        tokio::time::sleep(ms(17)).await;
        handle.write(b"s".to_vec()).await.unwrap();

        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let Some(bytes) = event.data() {
                out.extend_from_slice(bytes);
            }
        }
        let packets = packets(&out);
        assert_eq!(packets.len(), 4);
        assert_eq!(packets[2].variant, PacketVariant::AccelSyncSet);
        assert!(handle.snapshot().await.unwrap().synced);

        handle.shutdown().await.unwrap();
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn fragmentation() -> impl Strategy<Value = Fragmentation> {
        prop_oneof![
            Just(Fragmentation::None),
            Just(Fragmentation::Random),
            Just(Fragmentation::FullBuffers),
            Just(Fragmentation::OneByOne),
        ]
    }

    proptest! {
        #[test]
        fn output_is_lossless_and_bounded(
            writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..200), 0..20),
            policy in fragmentation(),
            capacity in 1usize..128,
            latency_ms in 0u64..20,
        ) {
            let latency = if policy.bypasses_latency() {
                Duration::ZERO
            } else {
                Duration::from_millis(latency_ms)
            };
            let mut buffer = OutputBuffer::new(capacity, policy, latency);
            let mut now = Instant::now();
            let mut emitted: Vec<Vec<u8>> = Vec::new();

            for data in &writes {
                buffer.write(data, now, |f| emitted.push(f));
                prop_assert!(buffer.queued() <= capacity);

                while buffer.deadline().map_or(false, |at| at <= now) {
                    if let Some(fragment) = buffer.fire() {
                        emitted.push(fragment);
                    }
                }
                now += Duration::from_millis(1);
            }
            while let Some(fragment) = buffer.fire() {
                emitted.push(fragment);
            }

            prop_assert!(emitted.iter().all(|f| !f.is_empty()));
            if policy == Fragmentation::OneByOne {
                prop_assert!(emitted.iter().all(|f| f.len() == 1));
            }
            prop_assert_eq!(emitted.concat(), writes.concat());
        }
    }
}
