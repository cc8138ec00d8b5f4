//! Data models shared between the API, the store and the renderer

pub mod order;

pub use order::{
    MarkPrintedRequest, NO_TABLE, Order, OrderIntake, OrderItem, OrderItemIntake,
    generate_order_id,
};
