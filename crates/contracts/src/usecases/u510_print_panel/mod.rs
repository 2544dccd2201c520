pub mod preview;
pub mod request;
pub mod view;
