use proptest::prelude::*;
use repairdesk_list_core::{
    AmountRange, ORDERS, OrderRecord, Pagination, QueryCriteria, QuickFilter, SortKey, apply_query,
    record::DateField,
};

const STATUSES: [&str; 6] = ["建立", "已下單", "已到貨", "已結案", "已取消", " 已下單 "];
const TODAY: &str = "2025-01-01";

fn arb_date() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (2019_u32..2027, 1_u32..13, 1_u32..29)
            .prop_map(|(year, month, day)| format!("{year:04}-{month:02}-{day:02}")),
        (2019_u32..2027, 1_u32..13, 1_u32..29, 0_u32..24)
            .prop_map(|(year, month, day, hour)| {
                format!("{year:04}-{month:02}-{day:02}T{hour:02}:00:00Z")
            }),
        Just("not-a-date".to_string()),
    ]
}

fn arb_order() -> impl Strategy<Value = OrderRecord> {
    (
        "[A-Z][0-9]{1,3}",
        prop::sample::select(STATUSES.to_vec()),
        arb_date(),
        arb_date(),
        arb_date(),
        prop_oneof![Just(0.0), 0.0_f64..5_000.0],
        "[a-z]{0,6}",
    )
        .prop_map(|(id, status, updated_at, ordered_at, expected_at, total_amount, supplier)| {
            OrderRecord {
                id,
                status: status.to_string(),
                updated_at,
                ordered_at,
                expected_at,
                total_amount,
                supplier,
                ..OrderRecord::default()
            }
        })
}

fn arb_sort() -> impl Strategy<Value = SortKey> {
    prop::sample::select(ORDERS.sort_keys.to_vec())
}

fn arb_quick() -> impl Strategy<Value = QuickFilter> {
    prop_oneof![
        Just(QuickFilter::All),
        Just(QuickFilter::Overdue),
        Just(QuickFilter::OpenOnly),
        prop::sample::select(STATUSES.to_vec())
            .prop_map(|status| QuickFilter::Status(status.to_string())),
    ]
}

fn arb_bound() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        Just("abc".to_string()),
        (0_u32..5_000).prop_map(|value| value.to_string()),
    ]
}

fn arb_criteria() -> impl Strategy<Value = QueryCriteria> {
    (arb_quick(), arb_sort(), arb_bound(), arb_bound(), arb_date(), "[a-z]{0,2}").prop_map(
        |(quick, sort, min, max, from, supplier)| {
            let mut criteria = QueryCriteria::for_profile(&ORDERS);
            criteria.quick = quick;
            criteria.sort = sort;
            criteria.amount = AmountRange { min, max };
            criteria.date_range_mut(DateField::Ordered).from = from;
            criteria.text_filters[0].needle = supplier;
            criteria
        },
    )
}

fn ids(rows: &[&OrderRecord]) -> Vec<String> {
    rows.iter().map(|row| row.id.clone()).collect()
}

proptest! {
    #[test]
    fn pipeline_is_deterministic(
        rows in prop::collection::vec(arb_order(), 0..40),
        criteria in arb_criteria(),
    ) {
        let first = ids(&apply_query(&rows, &criteria, &ORDERS, TODAY));
        let second = ids(&apply_query(&rows, &criteria, &ORDERS, TODAY));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn sort_order_does_not_depend_on_input_order(
        rows in prop::collection::vec(arb_order(), 0..30),
        criteria in arb_criteria(),
    ) {
        // Ids may repeat, so compare whole rows rather than positions.
        let forward: Vec<OrderRecord> =
            apply_query(&rows, &criteria, &ORDERS, TODAY).into_iter().cloned().collect();
        let reversed_input: Vec<OrderRecord> = rows.iter().rev().cloned().collect();
        let backward: Vec<OrderRecord> =
            apply_query(&reversed_input, &criteria, &ORDERS, TODAY).into_iter().cloned().collect();
        prop_assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(&backward) {
            prop_assert_eq!(criteria.sort.compare(a, b), std::cmp::Ordering::Equal);
        }
    }

    #[test]
    fn empty_amount_bounds_admit_every_row(
        rows in prop::collection::vec(arb_order(), 0..40),
        blank in prop_oneof![Just(String::new()), Just("  ".to_string())],
    ) {
        let mut criteria = QueryCriteria::for_profile(&ORDERS);
        criteria.amount = AmountRange { min: blank.clone(), max: blank };
        prop_assert_eq!(apply_query(&rows, &criteria, &ORDERS, TODAY).len(), rows.len());
    }

    #[test]
    fn quick_filters_only_ever_narrow(
        rows in prop::collection::vec(arb_order(), 0..40),
        quick in arb_quick(),
    ) {
        let all = apply_query(&rows, &QueryCriteria::for_profile(&ORDERS), &ORDERS, TODAY).len();
        let criteria = QueryCriteria { quick, ..QueryCriteria::for_profile(&ORDERS) };
        prop_assert!(apply_query(&rows, &criteria, &ORDERS, TODAY).len() <= all);
    }

    #[test]
    fn pagination_resets_on_every_signature_change(
        page_size in 1_usize..100,
        growth in prop::collection::vec(0_usize..5, 1..8),
        first in arb_criteria(),
        second in arb_criteria(),
    ) {
        let mut paging = Pagination::new(page_size);
        paging.on_query_change(&first.signature());
        for steps in &growth {
            for _ in 0..*steps {
                paging.load_more();
            }
            let before = paging.visible_count();
            let reset = paging.on_query_change(&first.signature());
            prop_assert!(!reset);
            prop_assert_eq!(paging.visible_count(), before);
        }

        let changed = first.signature() != second.signature();
        prop_assert_eq!(paging.on_query_change(&second.signature()), changed);
        if changed {
            prop_assert_eq!(paging.visible_count(), page_size);
        }
    }

    #[test]
    fn visible_slice_never_exceeds_the_filtered_total(
        page_size in 1_usize..100,
        loads in 0_usize..6,
        total in 0_usize..400,
    ) {
        let rows: Vec<usize> = (0..total).collect();
        let mut paging = Pagination::new(page_size);
        for _ in 0..loads {
            paging.load_more();
        }
        let window = paging.window(total);
        prop_assert_eq!(paging.slice(&rows).len(), window.visible);
        prop_assert!(window.visible <= total);
        prop_assert_eq!(window.has_more, window.visible < total);
    }
}
