pub mod bootstrap;
pub mod jwt;
pub mod password;
