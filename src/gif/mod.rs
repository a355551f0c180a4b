pub mod assemble;
pub mod fade;
