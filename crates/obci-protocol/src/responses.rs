//! Board-to-host textual responses
//!
//! The firmware answers most commands with printable text terminated by the
//! `$$$` end-of-transmission marker. Radio sub-protocol answers are framed as
//! `Success: `/`Failure: ` + message + optional value byte + `$$$`.

use crate::FirmwareVersion;

/// End-of-transmission marker
pub const EOT: &[u8] = b"$$$";
/// Prefix of a successful radio response
pub const SUCCESS_PREFIX: &[u8] = b"Success: ";
/// Prefix of a failed radio response
pub const FAILURE_PREFIX: &[u8] = b"Failure: ";

/// Printed when the radio link cannot reach the board
pub const COMMS_TIMEOUT: &[u8] = b"Communications timeout - Device failed to poll Host";
/// Printed when a channel number is out of range
pub const CHANNEL_OUT_OF_RANGE: &[u8] = b"Verify channel number is less than 25";

/// Printed when SD logging starts
pub const SD_CARD_PRESENT: &[u8] =
    b"Wiring is correct and a card is present.\nCorresponding SD file OBCI_69.TXT\n";
/// Printed when SD logging stops without an active log
pub const SD_NO_OPEN_FILE: &[u8] = b"No open file to close\n";

/// Sync time acknowledgement
pub const SYNC_TIME_SENT: &[u8] = b",";

/// Daisy detached by the 8-channel command
pub const CHANNEL_MAX_8_DAISY_REMOVED: &[u8] = b"daisy removed";
/// 16-channel command while the daisy is already attached
pub const CHANNEL_MAX_16_DAISY_ALREADY_ATTACHED: &[u8] = b"16";
/// Daisy attached by the 16-channel command
pub const CHANNEL_MAX_16_DAISY_ATTACHED: &[u8] = b"daisy attached16";
/// 16-channel command without a daisy present
pub const CHANNEL_MAX_16_NO_DAISY: &[u8] = b"no daisy to attach!8";

/// Baud rate switch notices
pub const BAUD_RATE_DEFAULT_NOTICE: &[u8] = b"Switch your baud rate to 115200";
/// Fast baud rate switch notice
pub const BAUD_RATE_FAST_NOTICE: &[u8] = b"Switch your baud rate to 230400";
/// Completion token the board appends after a baud rate switch
pub const BAUD_RATE_COMPLETE: [u8; 4] = [0x24, 0x24, 0x24, 0xFF];

/// Radio system status: board reachable
pub const SYSTEM_UP: &[u8] = b"System is Up";
/// Radio system status: board unreachable
pub const SYSTEM_DOWN: &[u8] = b"System is Down";

/// Identification string printed on soft reset (without the trailing `$$$`)
pub fn identification(daisy: bool, firmware: FirmwareVersion) -> String {
    format!(
        "OpenBCI V3 Simulator On Board ADS1299 Device ID: 0x3E {} LIS3DH Device ID: 0x38422 {}",
        if daisy {
            "On Daisy ADS1299 Device ID: 0x3E\n"
        } else {
            ""
        },
        if firmware == FirmwareVersion::V2 {
            "Firmware: v2.0.0\n"
        } else {
            ""
        }
    )
}

/// Power-on ADS1299 register contents as (name, address, value)
const ADS1299_REGISTERS: [(&str, u8, u8); 24] = [
    ("ADS_ID", 0x00, 0x3E),
    ("CONFIG1", 0x01, 0x96),
    ("CONFIG2", 0x02, 0xC0),
    ("CONFIG3", 0x03, 0xEC),
    ("LOFF", 0x04, 0x02),
    ("CH1SET", 0x05, 0x68),
    ("CH2SET", 0x06, 0x68),
    ("CH3SET", 0x07, 0x68),
    ("CH4SET", 0x08, 0x68),
    ("CH5SET", 0x09, 0x68),
    ("CH6SET", 0x0A, 0x68),
    ("CH7SET", 0x0B, 0x68),
    ("CH8SET", 0x0C, 0x68),
    ("BIAS_SENSP", 0x0D, 0xFF),
    ("BIAS_SENSN", 0x0E, 0xFF),
    ("LOFF_SENSP", 0x0F, 0x00),
    ("LOFF_SENSN", 0x10, 0x00),
    ("LOFF_FLIP", 0x11, 0x00),
    ("LOFF_STATP", 0x12, 0x00),
    ("LOFF_STATN", 0x13, 0x00),
    ("GPIO", 0x14, 0x0F),
    ("MISC1", 0x15, 0x00),
    ("MISC2", 0x16, 0x00),
    ("CONFIG4", 0x17, 0x00),
];

/// LIS3DH register contents as (address, value)
const LIS3DH_REGISTERS: [(u8, u8); 17] = [
    (0x07, 0x00),
    (0x08, 0x00),
    (0x09, 0x00),
    (0x0A, 0x00),
    (0x0B, 0x00),
    (0x0C, 0x00),
    (0x0D, 0x00),
    (0x0E, 0x00),
    (0x0F, 0x33),
    (0x1F, 0x00),
    (0x20, 0x37),
    (0x21, 0x00),
    (0x22, 0x00),
    (0x23, 0x08),
    (0x24, 0x00),
    (0x25, 0x00),
    (0x2E, 0x00),
];

/// Render one ADS1299 block: `NAME, addr, value, b7, ..., b0` per register
fn ads1299_block(header: &str) -> String {
    let mut out = format!("\n{}\n", header);
    for (name, addr, value) in ADS1299_REGISTERS {
        let bits: Vec<String> = (0..8)
            .rev()
            .map(|bit| ((value >> bit) & 1).to_string())
            .collect();
        out.push_str(&format!(
            "{}, {:02X}, {:02X}, {}\n",
            name,
            addr,
            value,
            bits.join(", ")
        ));
    }
    out
}

/// Render the accelerometer block in the layout of the given firmware
fn lis3dh_block(firmware: FirmwareVersion) -> String {
    let mut out = String::from("\nLIS3DH Registers\n");
    for (addr, value) in LIS3DH_REGISTERS {
        match firmware {
            FirmwareVersion::V3 => out.push_str(&format!("0x{:02X} {:02X}\n", addr, value)),
            FirmwareVersion::V1 | FirmwareVersion::V2 => {
                out.push_str(&format!("0x{:02X}.{:X}\n", addr, value))
            }
        }
    }
    out
}

/// Register settings dump printed for `?` (without the trailing `$$$`)
pub fn register_query(daisy: bool, firmware: FirmwareVersion) -> String {
    let mut out = ads1299_block("Board ADS Registers");
    if daisy {
        out.push_str(&ads1299_block("Daisy ADS Registers"));
    }
    out.push_str(&lis3dh_block(firmware));
    out
}
