pub mod changes;
pub mod revision;
pub mod status;
pub mod sync;
