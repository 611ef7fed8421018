//! End-to-end tests through the `structura` facade.

#[path = "../common/mod.rs"]
mod common;

mod dataset_example;
mod documents;
mod numeric_kernels;
