pub mod activation_tokens;
pub mod categories;
pub mod games;
pub mod saves;
pub mod schema;
pub mod scores;
pub mod transactions;
pub mod users;
