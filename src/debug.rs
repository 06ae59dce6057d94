use crate::population::{Population, A};

impl std::fmt::Debug for Population {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Population");
        s.field("n", &self.len())
            .field("frequency_a", &self.frequency(A))
            .field("highest_label", &self.labels.highest());
        if !self.attributes.is_empty() {
            s.field("mean_attribute", &crate::util::mean(&self.attributes));
        }
        if !self.status.is_empty() {
            s.field("high_status", &self.status.count_ones());
        }
        if !self.clusters.is_empty() {
            //.field("clusters", &self.clusters)
            s.field(
                "clusters",
                &self.clusters.iter().copied().max().unwrap_or_default(),
            );
        }
        if !self.fitness.is_empty() {
            s.field("mean_fitness", &crate::util::mean(&self.fitness));
        }
        if !self.strategies.is_empty() {
            s.field("environment", &self.environment);
        }
        if self.fallbacks.any() {
            s.field("fallbacks", &self.fallbacks);
        }
        s.finish()
    }
}

impl std::fmt::Debug for crate::population::Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Snapshot").field(&**self).finish()
    }
}
