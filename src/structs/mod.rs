pub mod index;
pub mod layout;
pub mod responsibilities;
pub mod theta;
pub mod weights;
