pub mod clustering;
pub mod output;
pub mod pipeline;
