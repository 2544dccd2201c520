pub mod a025_print_order;
pub mod a026_custom_label;
pub mod p910_label_sheets;
pub mod u510_print_panel;
