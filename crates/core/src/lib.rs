pub mod models;
pub mod series;
pub mod traits;

pub use models::*;
pub use series::*;
pub use traits::*;
