pub mod who_am_i;
