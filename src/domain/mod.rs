//! Domain layer: lessons, money, scheduling records and the ports the
//! application layer talks through.

pub mod catalog;
pub mod lesson;
pub mod money;
pub mod notification;
pub mod payout;
pub mod ports;
pub mod pricing;
pub mod task;
pub mod ticket;
