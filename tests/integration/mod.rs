//! Integration tests: drive the compiled binary against temporary git repositories

mod helpers;
mod test_affected;
mod test_packages;
