pub mod allocation;
pub mod scp;
