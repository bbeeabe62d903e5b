pub mod prepare_env;
pub mod test_gateway;
