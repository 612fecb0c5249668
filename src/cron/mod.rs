mod scheduler;

pub use scheduler::ScanScheduler;
