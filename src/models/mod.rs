pub mod actor;
pub mod order;
pub mod review;
pub mod zone;
