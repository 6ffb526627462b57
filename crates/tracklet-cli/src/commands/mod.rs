pub mod issue;
pub mod serve;
