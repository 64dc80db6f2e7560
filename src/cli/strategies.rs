use tabled::{Table, Tabled};

use crate::{config::Config, pipeline::StrategyRegistry, warning};

#[derive(Tabled)]
struct StrategyTableRow {
    name: String,
    clusters: usize,
    #[tabled(rename = "configured")]
    active: String,
}

pub fn strategies(config: Option<&Config>) {
    let registry = StrategyRegistry::with_defaults();
    let configured = config.map(|c| c.clustering_algorithm.as_str());

    let mut rows = Vec::new();
    for name in registry.names() {
        match registry.create(name) {
            Ok(strategy) => rows.push(StrategyTableRow {
                name: name.to_string(),
                clusters: strategy.n_clusters(),
                active: if configured == Some(name) { "*" } else { "" }.to_string(),
            }),
            Err(e) => warning!("{}", e),
        }
    }

    println!("{}", Table::new(rows));
}
