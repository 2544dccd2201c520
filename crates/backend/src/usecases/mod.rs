pub mod u510_print_panel;
