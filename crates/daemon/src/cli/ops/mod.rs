pub mod daemon;
pub mod document;
pub mod health;
pub mod init;
pub mod version;

pub use daemon::Daemon;
pub use document::Document;
pub use health::Health;
pub use init::Init;
pub use version::Version;
