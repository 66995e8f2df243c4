// Conversion between parameters and the optimizer's vector
pub mod codec;
// Routines for likelihood and posterior evaluation
pub mod evaluation;
// Routines for logging
pub mod logger;
// Routines for optimization
pub mod optimization;
// Routines for output
pub mod output;
// Routines for settings
pub mod settings;
// Routines for simulation
pub mod simulation;
