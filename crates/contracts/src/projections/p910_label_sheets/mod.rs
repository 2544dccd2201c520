pub mod allocator;
pub mod dto;
