//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod notification;

pub use product::{effective_price, NewProduct, Product, ProductChanges, StockStatus};
pub use order::{
    CustomerInfo, DraftItem, Order, OrderDetails, OrderDraft, OrderError, OrderItem, OrderStatus, PaymentStatus, MAX_AMOUNT,
};
pub use cart::{CartItem, CartKey, CartLine};
pub use notification::{NewNotification, Notification};
