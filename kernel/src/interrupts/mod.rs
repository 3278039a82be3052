pub mod disk_interrupt;
