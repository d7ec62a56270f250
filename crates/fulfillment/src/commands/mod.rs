//! Concrete commands, one per handled event type.

mod collect_order;
mod fulfill_new_order;
mod prepare_items;
mod record_status_update;
mod restock_orders;
mod sweep_missing_items;

pub use collect_order::CollectOrder;
pub use fulfill_new_order::FulfillNewOrder;
pub use prepare_items::{KitchenStation, PrepareItems};
pub use record_status_update::RecordStatusUpdate;
pub use restock_orders::RestockOrders;
pub use sweep_missing_items::SweepMissingItems;
