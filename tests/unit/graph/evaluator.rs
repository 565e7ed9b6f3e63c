use super::*;

fn chain() -> (DerivationGraph<i64>, NodeId, NodeId, NodeId) {
    let mut g = DerivationGraph::<i64>::new();
    let src = g.add_source("/source", StageKind::Load).unwrap();
    let double = g
        .add_node("/double", StageKind::Remap, |inputs| {
            Ok(inputs.get(Slot::Image)? * 2)
        })
        .unwrap();
    let sum = g
        .add_node("/sum", StageKind::Reduce, |inputs| {
            Ok(inputs.get(Slot::Image)? + inputs.get(Slot::Contours)?)
        })
        .unwrap();
    g.link(src, double, Slot::Image).unwrap();
    g.link(double, sum, Slot::Image).unwrap();
    g.set_input(sum, Slot::Contours, 1).unwrap();
    (g, src, double, sum)
}

#[test]
fn unsupplied_source_is_missing_input() {
    let (mut g, _, _, sum) = chain();
    let err = g.output(sum).unwrap_err();
    assert!(matches!(err, LimboError::MissingInput(_)), "{err}");
}

#[test]
fn unlinked_slot_is_missing_input() {
    let mut g = DerivationGraph::<i64>::new();
    let n = g
        .add_node("/needs-image", StageKind::Extract, |inputs| {
            Ok(*inputs.get(Slot::Image)?)
        })
        .unwrap();
    let err = g.output(n).unwrap_err();
    assert!(matches!(err, LimboError::MissingInput(_)));
    assert!(err.to_string().contains("/needs-image"));
    assert_eq!(g.eval_count(n), 0);
}

#[test]
fn repeated_reads_evaluate_once() {
    let (mut g, src, double, sum) = chain();
    g.set_constant(src, 5).unwrap();
    assert_eq!(g.output(sum).unwrap(), 11);
    assert_eq!(g.output(sum).unwrap(), 11);
    assert_eq!(g.output(double).unwrap(), 10);
    assert_eq!(g.eval_count(double), 1);
    assert_eq!(g.eval_count(sum), 1);
}

#[test]
fn overriding_an_ancestor_reevaluates_descendants() {
    let (mut g, src, double, sum) = chain();
    g.set_constant(src, 5).unwrap();
    assert_eq!(g.output(sum).unwrap(), 11);
    assert!(g.is_cached(double));

    g.set_constant(src, 7).unwrap();
    assert!(!g.is_cached(double));
    assert!(!g.is_cached(sum));
    assert_eq!(g.output(sum).unwrap(), 15);
    assert_eq!(g.eval_count(double), 2);
    assert_eq!(g.eval_count(sum), 2);
}

#[test]
fn setting_an_input_invalidates_only_downstream() {
    let (mut g, src, double, sum) = chain();
    g.set_constant(src, 2).unwrap();
    g.output(sum).unwrap();

    g.set_input(sum, Slot::Contours, 100).unwrap();
    assert!(g.is_cached(double));
    assert_eq!(g.output(sum).unwrap(), 104);
    assert_eq!(g.eval_count(double), 1);
    assert_eq!(g.eval_count(sum), 2);
}

#[test]
fn overriding_a_computed_node_bypasses_its_task() {
    let (mut g, src, double, sum) = chain();
    g.set_constant(src, 1).unwrap();
    g.set_constant(double, 40).unwrap();
    assert_eq!(g.output(sum).unwrap(), 41);
    assert_eq!(g.eval_count(double), 0);

    g.clear_constant(double).unwrap();
    assert_eq!(g.output(sum).unwrap(), 3);
    assert_eq!(g.eval_count(double), 1);
}

#[test]
fn task_errors_are_not_cached() {
    let mut g = DerivationGraph::<i64>::new();
    let src = g.add_source("/source", StageKind::Load).unwrap();
    let checked = g
        .add_node("/checked", StageKind::Decode, |inputs| {
            let v = *inputs.get(Slot::Image)?;
            if v < 0 {
                return Err(LimboError::decode("negative"));
            }
            Ok(v)
        })
        .unwrap();
    g.link(src, checked, Slot::Image).unwrap();
    g.set_constant(src, -1).unwrap();
    assert!(matches!(g.output(checked), Err(LimboError::Decode(_))));
    assert!(!g.is_cached(checked));

    g.set_constant(src, 3).unwrap();
    assert_eq!(g.output(checked).unwrap(), 3);
}

#[test]
fn cycles_and_duplicates_are_rejected() {
    let (mut g, src, _, sum) = chain();
    assert!(matches!(
        g.link(sum, src, Slot::Image),
        Err(LimboError::Validation(_))
    ));
    assert!(matches!(
        g.link(sum, sum, Slot::Image),
        Err(LimboError::Validation(_))
    ));
    assert!(matches!(
        g.add_source("/source", StageKind::Load),
        Err(LimboError::Validation(_))
    ));
    assert!(matches!(g.output(NodeId(99)), Err(LimboError::Validation(_))));
}

#[test]
fn nodes_are_addressable_by_name() {
    let (g, src, double, _) = chain();
    assert_eq!(g.node_id("/source"), Some(src));
    assert_eq!(g.node_id("/double"), Some(double));
    assert_eq!(g.node_id("/nope"), None);
    assert_eq!(g.name(double), Some("/double"));
    assert_eq!(g.kind(double), Some(StageKind::Remap));
    assert_eq!(g.len(), 3);
}

#[test]
fn shared_ancestor_is_evaluated_once_for_two_consumers() {
    let mut g = DerivationGraph::<i64>::new();
    let src = g.add_source("/source", StageKind::Load).unwrap();
    let base = g
        .add_node("/base", StageKind::Remap, |i| Ok(*i.get(Slot::Image)?))
        .unwrap();
    let a = g
        .add_node("/a", StageKind::Extract, |i| Ok(i.get(Slot::Image)? + 1))
        .unwrap();
    let b = g
        .add_node("/b", StageKind::Extract, |i| Ok(i.get(Slot::Image)? + 2))
        .unwrap();
    g.link(src, base, Slot::Image).unwrap();
    g.link(base, a, Slot::Image).unwrap();
    g.link(base, b, Slot::Image).unwrap();
    g.set_constant(src, 10).unwrap();
    assert_eq!(g.output(a).unwrap(), 11);
    assert_eq!(g.output(b).unwrap(), 12);
    assert_eq!(g.eval_count(base), 1);
}
