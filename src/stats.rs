/// Counters collected across both migration phases.
///
/// The pipeline is single-threaded, so plain integers are enough.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    pub units_created: u64,
    pub closure_direct: u64,
    pub closure_indirect: u64,
    pub records_processed: u64,
    pub items_created: u64,
    pub authors_created: u64,
    pub unit_items_direct: u64,
    pub unit_items_indirect: u64,
    pub unknown_units_skipped: u64,
}

impl MigrationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closure_edges(&self) -> u64 {
        self.closure_direct + self.closure_indirect
    }

    pub fn unit_items(&self) -> u64 {
        self.unit_items_direct + self.unit_items_indirect
    }
}
