pub mod check_config;
pub mod purge_image;
pub mod serve;
