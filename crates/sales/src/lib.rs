//! Sales domain module: addresses, cart, checkout and the order lifecycle.
//!
//! Business rules are implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod address;
pub mod cart;
pub mod checkout;
pub mod order;

pub use address::{Address, AddressPatch, AddressSnapshot, NewAddress};
pub use cart::{merged_quantity, summarize, CartItem, CartLine, CartSummary};
pub use checkout::build_order;
pub use order::{Order, OrderItem, OrderStatus, StockDecrement};
