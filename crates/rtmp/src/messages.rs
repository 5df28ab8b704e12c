//! RTMP message types.

/// An RTMP message type id.
///
/// Only the ids the relay has to act on are interpreted; everything else is
/// forwarded untouched, so unknown ids are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(pub u8);

impl MessageType {
    // Protocol Control Messages
    /// Set Chunk Size (5.4.1)
    pub const SET_CHUNK_SIZE: Self = Self(1);
    /// Abort Message (5.4.2)
    pub const ABORT: Self = Self(2);
    /// Acknowledgement (5.4.3)
    pub const ACKNOWLEDGEMENT: Self = Self(3);
    /// User Control Message (6.2)
    pub const USER_CONTROL_EVENT: Self = Self(4);
    /// Window Acknowledgement Size (5.4.4)
    pub const WINDOW_ACKNOWLEDGEMENT_SIZE: Self = Self(5);
    /// Set Peer Bandwidth (5.4.5)
    pub const SET_PEER_BANDWIDTH: Self = Self(6);
    // RTMP Command Messages
    /// Audio message (7.1.4)
    pub const AUDIO: Self = Self(8);
    /// Video message (7.1.5)
    pub const VIDEO: Self = Self(9);
    /// AMF3 data message (7.1.2)
    pub const DATA_AMF3: Self = Self(15);
    /// AMF3 shared object message (7.1.3)
    pub const SHARED_OBJ_AMF3: Self = Self(16);
    /// AMF3 command message (7.1.1)
    pub const COMMAND_AMF3: Self = Self(17);
    /// AMF0 data message (7.1.2)
    pub const DATA_AMF0: Self = Self(18);
    /// AMF0 shared object message (7.1.3)
    pub const SHARED_OBJ_AMF0: Self = Self(19);
    /// AMF0 command message (7.1.1)
    pub const COMMAND_AMF0: Self = Self(20);
    /// Aggregate message (7.1.6)
    pub const AGGREGATE: Self = Self(22);
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value.0
    }
}
