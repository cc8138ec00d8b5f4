//! Station 134 print server
//!
//! Accepts paid orders over HTTP, keeps them in a durable redb mailbox and
//! prints each one exactly once on the bar's network receipt printer.
//!
//! ```text
//! print-server/src/
//! ├── core/       # config, state, errors, server, background tasks
//! ├── orders/     # order store, dedup ledger, order sources
//! ├── printing/   # receipt renderer, dispatcher
//! ├── api/        # HTTP routes and handlers
//! └── utils/      # logging
//! ```

pub mod api;
pub mod core;
pub mod orders;
pub mod printing;
pub mod utils;

pub use crate::core::{Cli, CliCommand, Config, Server, ServerError, ServerState};
pub use orders::{DedupLedger, HttpOrderFeed, MarkOutcome, OrderSource, OrderStore};
pub use printing::{Dispatcher, ReceiptRenderer, TickReport};
pub use utils::init_logger;

/// Create the work directory and start logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    init_logger(&config.log_level, config.log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ____  _        _   _               _ _____ _  _
 / ___|| |_ __ _| |_(_) ___  _ __   / |___ /| || |
 \___ \| __/ _` | __| |/ _ \| '_ \  | | |_ \| || |_
  ___) | || (_| | |_| | (_) | | | | | |___) |__   _|
 |____/ \__\__,_|\__|_|\___/|_| |_| |_|____/   |_|
                                    print server
    "#
    );
}
