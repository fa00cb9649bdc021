pub mod category;
pub mod hardware;
pub mod hardware_category;
pub mod incident;
pub mod order;
pub mod order_item;
pub mod team;
