// Ordering flow services
pub mod commerce;
