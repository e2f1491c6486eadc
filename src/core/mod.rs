pub mod markov;
pub mod mentions;
pub mod pipeline;
pub mod sanitize;
pub mod shared;
pub mod tokenize;
