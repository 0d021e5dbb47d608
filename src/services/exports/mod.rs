pub mod base_logger;
