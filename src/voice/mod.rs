pub mod connection;
pub mod loopback;

pub use connection::{BoxedConnection, VoiceConnection, VoiceNode, VoicePresence};
pub use loopback::{LoopbackConnection, LoopbackNode};
