pub mod catalog;
pub mod item;
pub mod order;

pub use catalog::{Catalog, StoreSettings};
pub use item::{Family, ItemDetails, LineItem, Selection};
pub use order::{Advisory, BuiltOrder, CustomerFields, LastOrder, Order, PaymentMode, Totals};
