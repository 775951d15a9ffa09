pub mod billing;
pub mod clockify;
pub mod deadline;
pub mod email;
