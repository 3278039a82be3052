pub mod open_file;
