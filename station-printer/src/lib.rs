//! ESC/POS bytes and the raw TCP transport for the Station 134 receipt printer.
//!
//! [`Command`] enumerates every control sequence a receipt may contain,
//! [`EscPosBuilder`] strings them together with text, and [`Charset`] decides
//! how that text reaches the printer. Receipt layout lives in `print-server`.
//!
//! ## Example
//!
//! ```ignore
//! use station_printer::{Charset, EscPosBuilder, FontSize, NetworkPrinter, Printer};
//!
//! let mut builder = EscPosBuilder::new(32);
//! builder.center().bold(true).size(FontSize::Double);
//! builder.line("STATION 134");
//! builder.size(FontSize::Normal).bold(false);
//! builder.rule('=');
//! builder.cut();
//!
//! let printer = NetworkPrinter::new("192.168.1.19", 9100)?;
//! printer.print(&builder.build(Charset::Utf8)).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

pub use encoding::{Charset, UnknownCharset, encode_for_printer};
pub use error::{PrintError, PrintResult};
pub use escpos::{Alignment, Command, EscPosBuilder, FontSize};
pub use printer::{DEFAULT_PRINTER_PORT, NetworkPrinter, Printer};
