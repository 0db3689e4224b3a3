use metrics::increment_counter;

/// Count a settled mutation by kind and terminal state.
pub fn mutation_settled(kind: &'static str, outcome: &'static str) {
    increment_counter!("weylo_mutations_total", "kind" => kind, "outcome" => outcome);
}

pub fn feed_page_loaded() {
    increment_counter!("weylo_feed_pages_total");
}
