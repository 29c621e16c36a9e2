pub mod helpers;
mod resolution;
