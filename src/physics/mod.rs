pub mod body_sim;
pub mod broad_phase;
pub mod element;
pub mod filters;
pub mod handles;
pub mod narrow_phase;
pub mod pose;
pub mod settings;
pub mod shape_core;
pub mod shape_sim;
pub mod simulation;
