//! Customer receipt renderer
//!
//! Renders a paid [`Order`] into ESC/POS bytes for the bar's receipt printer.
//! Output is deterministic for a given order, timezone and charset.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{NO_TABLE, Order, OrderItem};
use shared::money::{format_euro, line_total, parse_price};
use station_printer::{Charset, EscPosBuilder, FontSize};

/// 58mm paper
pub const RECEIPT_WIDTH: usize = 32;

const SHOP_NAME: &str = "STATION 134";
const TITLE: &str = "Bestelling";
const TEST_TITLE: &str = "Test Bestelling";
const THANK_YOU: &str = "Bedankt voor uw bestelling!";

/// Receipt renderer
#[derive(Debug, Clone)]
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    charset: Charset,
    open_drawer: bool,
}

impl ReceiptRenderer {
    pub fn new(timezone: Tz, charset: Charset) -> Self {
        Self {
            width: RECEIPT_WIDTH,
            timezone,
            charset,
            open_drawer: false,
        }
    }

    /// Kick the cash drawer right before every cut
    pub fn with_open_drawer(mut self, open_drawer: bool) -> Self {
        self.open_drawer = open_drawer;
        self
    }

    /// Render an order receipt
    pub fn render(&self, order: &Order) -> Vec<u8> {
        self.render_with_title(order, TITLE)
    }

    /// Render the synthetic receipt used to check a printer
    pub fn render_test(&self, now: DateTime<Utc>) -> Vec<u8> {
        self.render_with_title(&test_order(now), TEST_TITLE)
    }

    fn render_with_title(&self, order: &Order, title: &str) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width);

        self.render_header(&mut b, title);
        self.render_info(&mut b, order);

        b.bold(true);
        b.line("ITEMS:");
        b.bold(false);
        b.rule('=');

        let mut total = Decimal::ZERO;
        for item in &order.items {
            let amount = self.render_item(&mut b, order, item);
            total = total.checked_add(amount).unwrap_or_else(|| {
                tracing::warn!(order_id = %order.id, "Receipt total overflowed, keeping running sum");
                total
            });
        }

        b.rule('=');
        b.bold(true);
        b.right();
        b.line(&format!("TOTAAL: {}", format_euro(total)));
        b.bold(false);
        b.left();

        if let Some(comment) = order.comment.as_deref().map(str::trim)
            && !comment.is_empty()
        {
            b.newline();
            b.bold(true);
            b.line("OPMERKING:");
            b.bold(false);
            b.line(comment);
        }

        self.render_footer(&mut b);
        b.build(self.charset)
    }

    fn render_header(&self, b: &mut EscPosBuilder, title: &str) {
        b.center();
        b.bold(true);
        b.size(FontSize::Double);
        b.line(SHOP_NAME);
        b.size(FontSize::Normal);
        b.bold(false);
        b.line(title);
        b.rule('=');
    }

    fn render_info(&self, b: &mut EscPosBuilder, order: &Order) {
        let table = match order.table.trim() {
            "" => NO_TABLE,
            table => table,
        };
        let id = match order.id.trim() {
            "" => "N/A",
            id => id,
        };

        b.left();
        b.line(&format!(
            "Datum: {}",
            format_timestamp(order.timestamp, self.timezone)
        ));
        b.line(&format!("Tafel: {}", table));
        b.line(&format!("Order ID: {}", id));
        b.newline();
    }

    /// Render one item and return its line total
    fn render_item(&self, b: &mut EscPosBuilder, order: &Order, item: &OrderItem) -> Decimal {
        let unit = parse_price(&item.price).unwrap_or_else(|e| {
            tracing::warn!(
                order_id = %order.id,
                item = %item.name,
                error = %e,
                "Unparseable item price, counting as zero"
            );
            Decimal::ZERO
        });
        let amount = line_total(unit, item.quantity).unwrap_or_else(|| {
            tracing::warn!(order_id = %order.id, item = %item.name, "Line total overflowed, counting as zero");
            Decimal::ZERO
        });

        b.line(&format!("{}x {}", item.quantity, item.label()));
        if let Some(options) = item.options.as_deref()
            && !options.trim().is_empty()
        {
            b.line(&format!("   Opties: {}", options));
        }
        b.right();
        b.line(&format_euro(amount));
        b.left();
        b.newline();

        amount
    }

    fn render_footer(&self, b: &mut EscPosBuilder) {
        b.newline();
        b.center();
        b.line(THANK_YOU);
        b.newline();
        b.newline();
        if self.open_drawer {
            b.open_drawer();
        }
        b.cut();
    }
}

/// `dd-mm-YYYY HH:MM:SS` in the receipt timezone
fn format_timestamp(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%d-%m-%Y %H:%M:%S").to_string()
}

fn test_order(now: DateTime<Utc>) -> Order {
    Order {
        id: format!("TEST-{}", now.timestamp_millis()),
        table: "TEST".to_string(),
        items: vec![
            OrderItem {
                name: "Hamburger Classic".to_string(),
                display_name: None,
                price: "€12,50".to_string(),
                quantity: 1,
                options: Some("Extra kaas, geen ui".to_string()),
            },
            OrderItem {
                name: "Cola".to_string(),
                display_name: None,
                price: "€2,75".to_string(),
                quantity: 1,
                options: None,
            },
        ],
        total: Decimal::new(1525, 2),
        comment: None,
        tip: Decimal::ZERO,
        timestamp: now,
        printed: false,
        payment_id: None,
    }
}
