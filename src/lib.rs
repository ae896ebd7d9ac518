pub mod rsa;
pub mod ui;
pub mod util;
