use proptest::prelude::*;

/// One submission to the executor
#[derive(Debug, Clone, PartialEq)]
pub enum SubmittedOp {
    Add(Vec<String>),
    Remove(Vec<String>),
}

pub fn watch_id_strategy() -> impl Strategy<Value = String> + Clone {
    "[a-z][a-z0-9]{0,7}"
}

pub fn submitted_op_strategy() -> impl Strategy<Value = SubmittedOp> {
    let ids = prop::collection::vec(watch_id_strategy(), 1..4);
    prop_oneof![
        ids.clone().prop_map(SubmittedOp::Add),
        ids.prop_map(SubmittedOp::Remove),
    ]
}

pub fn submission_sequence_strategy() -> impl Strategy<Value = Vec<SubmittedOp>> {
    prop::collection::vec(submitted_op_strategy(), 1..12)
}
