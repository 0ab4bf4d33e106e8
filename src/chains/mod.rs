pub mod address;
pub mod registry;
pub mod resolver;
