pub mod service;

pub use service::CustomLabelService;
