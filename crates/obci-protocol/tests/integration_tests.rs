//! Integration tests for the board protocol
//!
//! These tests verify that the streaming codecs recover the original framing
//! no matter how a serial link chunks the bytes.

use obci_protocol::packet::{encode_packet, PacketCodec};
use obci_protocol::{
    Command, CommandCodec, EncodeCommand, LineNoise, PacketVariant, ProtocolCodec, RadioCommand,
    SampleGenerator, SdLogDuration,
};

mod helpers {
    use super::*;

    /// Split `bytes` at the given (unsorted, possibly out of range) cut points
    pub fn chunk(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
        let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(bytes[start..cut].to_vec());
            start = cut;
        }
        chunks.push(bytes[start..].to_vec());
        chunks
    }
}

mod host_session_tests {
    use super::*;

    #[test]
    fn test_connect_sequence_round_trip() {
        let session = vec![
            Command::SoftReset,
            Command::Radio(RadioCommand::ChannelGet),
            Command::Radio(RadioCommand::ChannelSet(7)),
            Command::ChannelMax16,
            Command::QueryRegisterSettings,
            Command::SyncTimeSet,
            Command::SdLogStart(SdLogDuration::Hour2),
            Command::StreamStart,
        ];
        let wire: Vec<u8> = session.iter().flat_map(|c| c.encode()).collect();

        let mut codec = CommandCodec::new();
        codec.push_bytes(&wire);
        let parsed: Vec<Command> = std::iter::from_fn(|| codec.next_command()).collect();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_stream_with_responses_interleaved() {
        let mut generator = SampleGenerator::new(8, 250, false, LineNoise::None);
        let mut wire = Vec::new();
        wire.extend_from_slice(b"daisy attached16$$$");
        for n in 0..3u8 {
            let variant = if n == 1 {
                wire.push(b',');
                PacketVariant::AccelSyncSet
            } else {
                PacketVariant::AccelSynced
            };
            wire.extend(encode_packet(&generator.generate(n), variant, Some(1000 + n as u32)));
        }

        let mut codec = PacketCodec::new();
        codec.push_bytes(&wire);
        let packets: Vec<_> = std::iter::from_fn(|| codec.next_command()).collect();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[1].variant, PacketVariant::AccelSyncSet);
        assert_eq!(packets[2].timestamp, Some(1002));
    }
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::StreamStart),
            Just(Command::StreamStop),
            Just(Command::SoftReset),
            Just(Command::SdLogStop),
            Just(Command::SyncTimeSet),
            Just(Command::ChannelMax8),
            Just(Command::ChannelMax16),
            Just(Command::QueryRegisterSettings),
            Just(Command::SdLogStart(SdLogDuration::Sec14)),
            Just(Command::SdLogStart(SdLogDuration::Hour24)),
            Just(Command::Radio(RadioCommand::ChannelGet)),
            Just(Command::Radio(RadioCommand::PollTimeGet)),
            Just(Command::Radio(RadioCommand::SystemStatus)),
            Just(Command::Radio(RadioCommand::BaudRateSetFast)),
            any::<u8>().prop_map(|n| Command::Radio(RadioCommand::ChannelSet(n))),
            any::<u8>().prop_map(|n| Command::Radio(RadioCommand::ChannelSetOverride(n))),
            any::<u8>().prop_map(|n| Command::Radio(RadioCommand::PollTimeSet(n))),
        ]
    }

    proptest! {
        #[test]
        fn command_framing_survives_chunking(
            commands in prop::collection::vec(command(), 1..30),
            cuts in prop::collection::vec(any::<usize>(), 0..10),
        ) {
            let wire: Vec<u8> = commands.iter().flat_map(|c| c.encode()).collect();

            let mut codec = CommandCodec::new();
            let mut parsed = Vec::new();
            for piece in helpers::chunk(&wire, &cuts) {
                codec.push_bytes(&piece);
                while let Some(cmd) = codec.next_command() {
                    parsed.push(cmd);
                }
            }
            prop_assert_eq!(parsed, commands);
        }

        #[test]
        fn packet_stream_survives_chunking(
            count in 1usize..20,
            cuts in prop::collection::vec(any::<usize>(), 0..10),
            accel in any::<bool>(),
        ) {
            let mut generator = SampleGenerator::new(8, 250, true, LineNoise::Hz60);
            let variant = if accel {
                PacketVariant::Standard
            } else {
                PacketVariant::RawAuxStandard
            };
            let wire: Vec<u8> = (0..count)
                .flat_map(|n| encode_packet(&generator.generate(n as u8), variant, None))
                .collect();

            let mut codec = PacketCodec::new();
            let mut numbers = Vec::new();
            for piece in helpers::chunk(&wire, &cuts) {
                codec.push_bytes(&piece);
                while let Some(packet) = codec.next_command() {
                    prop_assert_eq!(packet.variant, variant);
                    numbers.push(packet.sample_number);
                }
            }
            prop_assert_eq!(numbers, (0..count).map(|n| n as u8).collect::<Vec<_>>());
        }
    }
}
