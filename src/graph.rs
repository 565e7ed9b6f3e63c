pub(crate) mod evaluator;
pub(crate) mod stage;
