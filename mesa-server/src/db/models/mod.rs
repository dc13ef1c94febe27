//! Database Models

pub mod dining_table;
pub mod order;
pub mod restaurant;
pub mod serde_helpers;

pub use dining_table::{Align, DiningTable, DiningTableCreate, DiningTableUpdate, Position};
pub use order::{Order, OrderSlot};
pub use restaurant::Restaurant;
