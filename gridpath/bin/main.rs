use anyhow::Context;
use gridpath::{
    config::RunConfig, util::render, IntensityGraph, PathFinder, PathFinderState, Point,
};
use log::{info, warn};

/// Usage: `gridpath [config.json]`
fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    let field = config.source.load()?;
    let graph = IntensityGraph::from_field(&field);

    // corner to corner
    let start = Point::new(0, 0);
    let goal = Point::new(field.rows() - 1, field.columns() - 1);

    let (state, _) = PathFinder::new(&graph, start, goal, config.heuristic)?.finish(&graph);

    let result = match state {
        PathFinderState::PathFound(result) => {
            info!(
                "path from {} to {}: cost={} cells={}",
                start,
                goal,
                result.total_cost,
                result.path.len()
            );
            Some(result)
        }
        _ => {
            warn!("no path from {} to {}", start, goal);
            None
        }
    };

    if let Some(json_path) = &config.path_json {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(json_path, json)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        info!("wrote {}", json_path.display());
    }

    let path = result.map(|r| r.path).unwrap_or_default();
    render(&field, &path, &config.render)?
        .save(&config.output)
        .with_context(|| format!("failed to write {}", config.output.display()))?;
    info!("wrote {}", config.output.display());

    Ok(())
}
