pub mod bvn;
pub mod estep;
pub mod likelihood;
pub mod rectangle;
