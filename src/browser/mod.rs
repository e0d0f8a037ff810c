pub mod connection;
pub mod launch;
pub mod pool;
pub mod session;

pub use connection::connect_to_browser;
pub use launch::{default_candidates, launch_first_available, LaunchCandidate, COMPAT_ARGS};
pub use pool::PagePool;
pub use session::{BrowserSession, SessionOptions};
