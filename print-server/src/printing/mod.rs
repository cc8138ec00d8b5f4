//! Receipt printing
//!
//! - [`ReceiptRenderer`]: order to ESC/POS bytes
//! - [`Dispatcher`]: polls unprinted orders and prints each exactly once

mod dispatcher;
mod renderer;

pub use dispatcher::{Dispatcher, TickReport};
pub use renderer::{RECEIPT_WIDTH, ReceiptRenderer};
