pub mod customer_order;
pub mod delivery;
pub mod group;
pub mod nocodb_config;
pub mod order;
pub mod publicity;
pub mod supplier;
pub mod user;
pub mod user_group;

pub use customer_order::CustomerOrderStatus;
pub use delivery::{DeliveryStatus, DeliveryUnit};
pub use order::OrderStatus;
pub use user::Role;
