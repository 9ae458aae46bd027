pub mod output;
pub mod parameter;

// Re-export commonly used types at the model level.
pub use output::{ContentItem, Output, DATA_FORMAT};
pub use parameter::{ParamType, ParameterSchema, ParameterValues, SharedValues};
