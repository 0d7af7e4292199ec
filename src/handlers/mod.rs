pub mod active;
pub mod auth;
pub mod calendar;
pub mod exercises;
pub mod health;
pub mod history;
pub mod integrations;
pub mod measurements;
pub mod splits;
pub mod stats;
pub mod workouts;
