pub mod p910_label_sheets;
