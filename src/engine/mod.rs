pub mod lifecycle;
pub mod pricing;
