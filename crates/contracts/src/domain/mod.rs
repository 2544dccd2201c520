pub mod a025_print_order;
pub mod a026_custom_label;
