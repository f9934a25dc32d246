pub mod health;
pub mod who_am_i;
