pub mod locks;
pub mod session;
pub mod session_manager;

pub use locks::GuildLocks;
pub use session::{Session, SessionEvents};
pub use session_manager::SessionRegistry;
