pub mod block_list;
pub mod bootstrap;
pub mod capabilities;
pub mod commands;
pub mod countdown;
pub mod resume;
pub mod scheduler;
