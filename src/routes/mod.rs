pub mod gate;
pub mod health;
pub mod pages;
