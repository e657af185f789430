pub mod clipfiles;
