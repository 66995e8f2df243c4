pub mod mstep;
