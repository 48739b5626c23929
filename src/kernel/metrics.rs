use super::ProcessTable;

/// Mean ticks from creation to termination over the processes that have finished.
pub fn average_turnaround(table: &ProcessTable) -> f64 {
    let turnarounds: Vec<u64> = table.entries().filter_map(|entry| entry.turnaround()).collect();
    if turnarounds.is_empty() {
        return 0.0;
    }

    turnarounds.iter().sum::<u64>() as f64 / turnarounds.len() as f64
}

/// Longest wait any process had between two dispatches.
pub fn maximal_starvation(table: &ProcessTable) -> u64 {
    table.entries().map(|entry| entry.max_starvation).max().unwrap_or(0)
}
