//! ESC/POS command set and builder
//!
//! Every byte sequence the receipts use is listed once in [`Command`], so the
//! renderer can be audited against the printer manual without reading ad-hoc
//! string concatenation.

use crate::encoding::{Charset, encode_for_printer};

/// Horizontal text alignment (`ESC a n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Character size (`GS ! n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    Normal,
    DoubleWidth,
    DoubleHeight,
    Double,
}

/// The closed set of ESC/POS commands emitted by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// ESC @ - reset the printer to power-on state
    Init,
    /// ESC a n
    Align(Alignment),
    /// ESC E n
    Bold(bool),
    /// GS ! n
    Size(FontSize),
    /// LF - print buffer and feed one line
    LineFeed,
    /// GS V 66 0 - feed to the cutter position and do a full cut
    Cut,
    /// ESC p 0 25 250 - pulse drawer connector pin 2
    DrawerKick,
    /// ESC t 16 - select character table WPC1252
    CodeTableWpc1252,
}

impl Command {
    /// Raw bytes of the command
    pub const fn bytes(&self) -> &'static [u8] {
        match self {
            Command::Init => &[0x1B, 0x40],
            Command::Align(Alignment::Left) => &[0x1B, 0x61, 0x00],
            Command::Align(Alignment::Center) => &[0x1B, 0x61, 0x01],
            Command::Align(Alignment::Right) => &[0x1B, 0x61, 0x02],
            Command::Bold(true) => &[0x1B, 0x45, 0x01],
            Command::Bold(false) => &[0x1B, 0x45, 0x00],
            Command::Size(FontSize::Normal) => &[0x1D, 0x21, 0x00],
            Command::Size(FontSize::DoubleWidth) => &[0x1D, 0x21, 0x10],
            Command::Size(FontSize::DoubleHeight) => &[0x1D, 0x21, 0x01],
            Command::Size(FontSize::Double) => &[0x1D, 0x21, 0x11],
            Command::LineFeed => &[0x0A],
            Command::Cut => &[0x1D, 0x56, 0x42, 0x00],
            Command::DrawerKick => &[0x1B, 0x70, 0x00, 0x19, 0xFA],
            Command::CodeTableWpc1252 => &[0x1B, 0x74, 0x10],
        }
    }
}

/// Receipt byte stream
///
/// Text is kept as UTF-8 next to the command bytes and only converted to the
/// printer's character table in [`EscPosBuilder::build`]. The stream always
/// opens with [`Command::Init`].
pub struct EscPosBuilder {
    buf: Vec<u8>,
    columns: usize,
}

impl EscPosBuilder {
    /// `columns` is the paper width in characters at normal size (32 on 58mm rolls)
    pub fn new(columns: usize) -> Self {
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(Command::Init.bytes());
        Self { buf, columns }
    }

    pub fn command(&mut self, cmd: Command) -> &mut Self {
        self.buf.extend_from_slice(cmd.bytes());
        self
    }

    /// Append text, dropping control characters except `\n`
    ///
    /// Order data cannot inject commands into the stream.
    pub fn text(&mut self, s: &str) -> &mut Self {
        let clean = s.chars().filter(|&c| c == '\n' || !c.is_control());
        for c in clean {
            let mut tmp = [0u8; 4];
            self.buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
        self
    }

    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s).command(Command::LineFeed)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.command(Command::LineFeed)
    }

    pub fn center(&mut self) -> &mut Self {
        self.command(Command::Align(Alignment::Center))
    }

    pub fn left(&mut self) -> &mut Self {
        self.command(Command::Align(Alignment::Left))
    }

    pub fn right(&mut self) -> &mut Self {
        self.command(Command::Align(Alignment::Right))
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.command(Command::Bold(on))
    }

    pub fn size(&mut self, size: FontSize) -> &mut Self {
        self.command(Command::Size(size))
    }

    /// A full-width line of `fill`
    pub fn rule(&mut self, fill: char) -> &mut Self {
        let rule: String = std::iter::repeat_n(fill, self.columns).collect();
        self.line(&rule)
    }

    pub fn cut(&mut self) -> &mut Self {
        self.command(Command::Cut)
    }

    pub fn open_drawer(&mut self) -> &mut Self {
        self.command(Command::DrawerKick)
    }

    /// Final bytes for a printer using `charset`
    pub fn build(self, charset: Charset) -> Vec<u8> {
        encode_for_printer(&self.buf, charset)
    }

    /// Bytes as accumulated, text still UTF-8
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}
