pub mod system_git;
mod system_git_ops;

#[cfg(test)]
pub mod fixtures;

pub use system_git::SystemGit;
