pub mod command;
pub mod events;
pub mod messages;
pub mod tracks;

pub use command::*;
pub use events::*;
pub use tracks::*;
