pub mod cli;
pub mod climate;
pub mod config;
pub mod panels;
pub mod persistence;
pub mod simulation;
pub mod sky;
