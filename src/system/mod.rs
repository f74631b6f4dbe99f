pub mod git;
pub mod process;
