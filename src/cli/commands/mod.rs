//! One module per subcommand.

pub mod get;
pub mod grant;
pub mod history;
pub mod init;
pub mod list;
pub mod project;
pub mod run;
pub mod set;
