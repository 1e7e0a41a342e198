//! Command handlers -- one module per subcommand

pub mod block;
pub mod flush;
pub mod load;
pub mod status;
