//! Resource graph and business rules (spec.md §3, §4.3, §4.4).

pub mod node_model;
pub mod resource;
pub mod store;
pub mod types;

pub use node_model::NodeModel;
pub use resource::{Resource, ResourceBody, ResourceType, Version};
pub use store::{ChangeEvent, ResourceStore};
