pub mod agent;
pub mod doctor;
pub mod export;
pub mod tools;
