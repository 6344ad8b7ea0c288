pub mod lock_sweeper;
