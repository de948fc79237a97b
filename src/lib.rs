//! Library crate for kmodctl, a kernel module inventory and control tool

pub mod config;
pub mod error;
pub mod kernel;
pub mod session;
pub mod system;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod shell;
}

// Format modules
pub mod formats;
