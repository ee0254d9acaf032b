mod arity;
mod cascade;
pub(crate) mod helpers;
