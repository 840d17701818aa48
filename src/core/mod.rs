//! 核心层：错误类型与优雅关闭

pub mod error;
pub mod shutdown;

pub use error::BotError;
pub use shutdown::{install_signal_handlers, run_with_graceful_shutdown};
