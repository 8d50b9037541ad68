//! Events emitted by the simulator

/// Something the simulated board did that the host side can observe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatorEvent {
    /// The connection finished booting and accepts writes
    Opened,
    /// The connection was closed
    Closed,
    /// One output fragment
    Data(Vec<u8>),
}

impl SimulatorEvent {
    /// Payload of a data event
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            SimulatorEvent::Data(bytes) => Some(bytes),
            _ => None,
        }
    }
}
