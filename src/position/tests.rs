use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    id: u32,
    position: f64,
}

impl Orderable for Slot {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn container_id(&self) -> u32 {
        1
    }
}

fn slots(positions: &[f64]) -> Vec<Slot> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Slot { id: i as u32 + 1, position })
        .collect()
}

fn ids_in_order(slots: &[Slot]) -> Vec<u32> {
    let mut sorted = slots.to_vec();
    sorted.sort_by(|a, b| a.position.total_cmp(&b.position));
    sorted.iter().map(|s| s.id).collect()
}

#[test]
fn test_append_empty_container() {
    assert_eq!(append::<Slot>(&[]), 65535.0);
}

#[test]
fn test_append_after_max_not_last() {
    let siblings = slots(&[300.0, 900.0, 100.0]);
    assert_eq!(append(&siblings), 900.0 + STEP);
}

#[test]
fn test_append_past_step_precision() {
    let siblings = slots(&[1e21]);
    assert!(append(&siblings) > 1e21);

    let siblings = slots(&[-1e21, -3e21]);
    assert!(append(&siblings) > -1e21);
}

#[test]
fn test_plan_insert_tail_at_large_magnitude() {
    let mut siblings = slots(&[1.0, 1e21]);
    let placement = plan_insert(&mut siblings, 2).unwrap();
    assert!(!placement.rebalanced);
    assert!(placement.position > 1e21);

    // Nothing representable above f64::MAX, so the container is respaced
    let mut siblings = slots(&[1.0, f64::MAX]);
    let placement = plan_insert(&mut siblings, 2).unwrap();
    assert!(placement.rebalanced);
    assert_eq!(placement.position, 2.0 * STEP);
    assert_eq!(ids_in_order(&siblings), vec![1, 2]);
}

#[test]
fn test_insert_at_index_between_first_two() {
    let siblings = slots(&[65535.0, 131070.0, 196605.0]);
    let position = insert_at_index(&siblings, 1).unwrap();
    assert_eq!(position, 98302.5);
}

#[test]
fn test_insert_at_index_head_and_tail() {
    let siblings = slots(&[196605.0, 65535.0, 131070.0]);
    assert_eq!(insert_at_index(&siblings, 0).unwrap(), 32767.5);
    assert_eq!(insert_at_index(&siblings, 3).unwrap(), 196605.0 + STEP);
    // Past the end behaves like an append
    assert_eq!(insert_at_index(&siblings, 42).unwrap(), 196605.0 + STEP);
}

#[test]
fn test_insert_between_head_non_positive() {
    assert_eq!(insert_between(None, Some(0.0)).unwrap(), -STEP);
    assert_eq!(insert_between(None, Some(-10.0)).unwrap(), -10.0 - STEP);
}

#[test]
fn test_insert_between_unbounded() {
    assert_eq!(insert_between(None, None).unwrap(), STEP);
    assert_eq!(insert_between(Some(10.0), None).unwrap(), 10.0 + STEP);
}

#[test]
fn test_insert_between_misordered() {
    let err = insert_between(Some(200.0), Some(100.0)).unwrap_err();
    assert_eq!(err, PositionError::InvalidOrdering { prev: 200.0, next: 100.0 });
}

#[test]
fn test_insert_between_equal_and_nan() {
    assert!(insert_between(Some(5.0), Some(5.0)).is_err());
    assert!(insert_between(Some(f64::NAN), Some(5.0)).is_err());
}

#[test]
fn test_insert_between_rejects_non_finite_single_neighbour() {
    assert!(insert_between(Some(f64::NAN), None).is_err());
    assert!(insert_between(None, Some(f64::NAN)).is_err());
    assert!(insert_between(Some(f64::INFINITY), None).is_err());
    assert!(matches!(
        insert_between(None, Some(f64::NEG_INFINITY)),
        Err(PositionError::InvalidOrdering { prev, .. }) if prev == f64::NEG_INFINITY
    ));
}

#[test]
fn test_insert_between_head_past_step_precision() {
    let position = insert_between(None, Some(-1e21)).unwrap();
    assert!(position < -1e21);
}

#[test]
fn test_insert_at_index_with_tied_neighbours_fails() {
    let siblings = slots(&[10.0, 10.0]);
    assert!(insert_at_index(&siblings, 1).is_err());
}

#[test]
fn test_needs_rebalance_tiny_gap() {
    assert!(needs_rebalance(100.0, 100.0000000001));
    assert!(!needs_rebalance(100.0, 101.0));
    assert!(needs_rebalance(100.0, 100.0));
    assert!(needs_rebalance(200.0, 100.0));
}

#[test]
fn test_rebalance_after_precision_exhausted() {
    let mut siblings = slots(&[100.0000000001, 50.0, 100.0, 7000.0]);
    let prev = 100.0;
    let next = 100.0000000001;
    assert!(needs_rebalance(prev, next));

    rebalance(&mut siblings);

    let positions: Vec<f64> = siblings.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0.0, 65535.0, 131070.0, 196605.0]);
    let ids: Vec<u32> = siblings.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![2, 3, 1, 4]);
}

#[test]
fn test_rebalance_keeps_tie_input_order() {
    let mut siblings = slots(&[5.0, 5.0, 1.0]);
    rebalance(&mut siblings);
    let ids: Vec<u32> = siblings.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn test_plan_insert_without_rebalance() {
    let mut siblings = slots(&[65535.0, 131070.0]);
    let placement = plan_insert(&mut siblings, 1).unwrap();
    assert_eq!(placement, Placement { position: 98302.5, rebalanced: false });
    assert_eq!(siblings[0].position, 65535.0);
}

#[test]
fn test_plan_insert_rebalances_tight_gap() {
    let mut siblings = slots(&[100.0, 100.0000000001, 300.0]);
    let placement = plan_insert(&mut siblings, 1).unwrap();

    assert!(placement.rebalanced);
    let positions: Vec<f64> = siblings.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0.0, 65535.0, 131070.0]);
    assert_eq!(placement.position, 32767.5);
}

#[test]
fn test_plan_insert_resolves_ties() {
    let mut siblings = slots(&[42.0, 42.0]);
    let placement = plan_insert(&mut siblings, 1).unwrap();
    assert!(placement.rebalanced);
    assert!(placement.position > siblings[0].position);
    assert!(placement.position < siblings[1].position);
}

#[test]
fn test_plan_insert_head_of_tiny_positions() {
    let mut siblings = slots(&[1e-12, 1.0]);
    let placement = plan_insert(&mut siblings, 0).unwrap();
    assert!(placement.rebalanced);
    assert_eq!(placement.position, -STEP);
}

#[test]
fn test_repeated_bisection_keeps_requested_order() {
    let mut siblings = slots(&[STEP, 2.0 * STEP]);
    let mut expected: Vec<u32> = vec![1, 2];
    let mut rebalances = 0;

    for id in 3..=120u32 {
        let placement = plan_insert(&mut siblings, 1).unwrap();
        if placement.rebalanced {
            rebalances += 1;
        }
        siblings.push(Slot { id, position: placement.position });
        expected.insert(1, id);
        assert_eq!(ids_in_order(&siblings), expected);
    }

    assert!(rebalances >= 1);
}

fn distinct_positions() -> impl Strategy<Value = Vec<f64>> {
    (-1e6f64..1e6, prop::collection::vec(1.0f64..1e5, 0..20))
        .prop_map(|(start, gaps)| {
            gaps.iter()
                .scan(start, |acc, gap| {
                    *acc += gap;
                    Some(*acc)
                })
                .collect::<Vec<f64>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn prop_append_sorts_last(positions in prop::collection::vec(-1e300f64..1e300, 1..30)) {
        let siblings = slots(&positions);
        let position = append(&siblings);
        prop_assert!(positions.iter().all(|&p| position > p));
    }

    #[test]
    fn prop_plan_insert_tail_sorts_last(positions in prop::collection::vec(-1e300f64..1e300, 0..30)) {
        let mut siblings = slots(&positions);
        let len = siblings.len();
        let placement = plan_insert(&mut siblings, len).unwrap();
        prop_assert!(placement.position.is_finite());
        prop_assert!(siblings.iter().all(|s| placement.position - s.position >= MIN_GAP));
    }

    #[test]
    fn prop_insert_between_is_strictly_inside(prev in -1e9f64..1e9, gap in 1e-3f64..1e9) {
        let next = prev + gap;
        let position = insert_between(Some(prev), Some(next)).unwrap();
        prop_assert!(prev < position && position < next);
    }

    #[test]
    fn prop_insert_at_index_lands_on_index(positions in distinct_positions(), pick in any::<prop::sample::Index>()) {
        let siblings = slots(&positions);
        let target = pick.index(siblings.len() + 1);
        let position = insert_at_index(&siblings, target).unwrap();

        let mut all = siblings.clone();
        all.push(Slot { id: 0, position });
        let order = ids_in_order(&all);
        prop_assert_eq!(order.iter().position(|&id| id == 0), Some(target));
    }

    #[test]
    fn prop_rebalance_preserves_order_and_is_idempotent(positions in prop::collection::vec(-50i32..50, 0..40)) {
        let positions: Vec<f64> = positions.into_iter().map(f64::from).collect();
        let mut siblings = slots(&positions);
        let before = ids_in_order(&siblings);

        rebalance(&mut siblings);
        let first: Vec<(u32, f64)> = siblings.iter().map(|s| (s.id, s.position)).collect();
        prop_assert_eq!(ids_in_order(&siblings), before);

        rebalance(&mut siblings);
        let second: Vec<(u32, f64)> = siblings.iter().map(|s| (s.id, s.position)).collect();
        prop_assert_eq!(first, second);
    }
}
