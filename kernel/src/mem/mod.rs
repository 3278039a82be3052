pub mod frame_table;
pub mod page_table;
pub mod pager;
