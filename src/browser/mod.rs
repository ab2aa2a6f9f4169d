//! Browser connection layer: tab discovery, the debugger channel, and page sessions

pub mod channel;
pub mod config;
pub mod page;
pub mod session;
pub mod target;

pub use channel::CdpChannel;
pub use config::ConnectionOptions;
pub use page::{ObjectHandle, Page};
pub use session::PageSession;
pub use target::{DebugTarget, LocatedTarget, TargetLocator, TargetMatch};
