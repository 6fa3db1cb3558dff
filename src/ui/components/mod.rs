mod devtools;

pub use devtools::QueryDevtools;
