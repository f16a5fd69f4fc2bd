pub mod request;
pub mod table;

pub use request::*;
pub use table::*;
