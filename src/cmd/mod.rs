//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled        |
//! |-----------------|-------------------------|
//! | `ask`           | `Ask`                   |
//! | `interactive`   | `Interactive`           |
//! | `info`          | `Stages`, `Ping`        |
//! | `config`        | `Config`                |

pub mod ask;
pub mod config;
pub mod info;
pub mod interactive;

pub use ask::cmd_ask;
pub use config::cmd_config;
pub use info::{cmd_ping, cmd_stages};
pub use interactive::cmd_interactive;
