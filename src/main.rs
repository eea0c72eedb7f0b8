use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use threatmap_lib::commands::{self, AppState};
use threatmap_lib::TimeWindow;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Threat records (JSON array or JSON Lines)
    #[arg(long)]
    input: PathBuf,

    /// Cluster linkage radius; defaults to the saved setting
    #[arg(long)]
    radius: Option<f64>,

    /// Time window: all, week, day, hour
    #[arg(long, default_value = "all")]
    window: TimeWindow,

    /// Animate an attack vector between two threat ids, e.g. `--vector 1:3`
    #[arg(long, value_parser = parse_vector)]
    vector: Vec<(u64, u64)>,

    /// Frames to drive at 60 Hz
    #[arg(long, default_value_t = 120)]
    ticks: u32,

    /// Write the density heatmap to this PNG
    #[arg(long)]
    heatmap: Option<PathBuf>,
}

fn parse_vector(s: &str) -> Result<(u64, u64), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SOURCE:TARGET, got '{}'", s))?;
    let source = a.trim().parse().map_err(|e| format!("bad source id '{}': {}", a, e))?;
    let target = b.trim().parse().map_err(|e| format!("bad target id '{}': {}", b, e))?;
    Ok((source, target))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let state = AppState::from_disk();
    let summary = commands::load_threats(args.input.to_string_lossy().to_string(), &state)
        .map_err(anyhow::Error::msg)?;
    log::info!("{} threats, {} visible", summary.total, summary.visible);

    if let Some(radius) = args.radius {
        commands::request_cluster(radius, &state).map_err(anyhow::Error::msg)?;
    }
    let summary = commands::set_time_window(args.window, &state).map_err(anyhow::Error::msg)?;
    let stats = &summary.stats;
    log::info!(
        "Window {:?}: {}/{} visible, {} clusters (avg {:.2}, largest {}, {} singletons)",
        summary.window,
        summary.visible,
        summary.total,
        stats.total_clusters,
        stats.average_members_per_cluster,
        stats.largest_cluster_size,
        stats.singleton_count
    );

    for (source, target) in &args.vector {
        match commands::spawn_attack_vector(*source, *target, &state) {
            Ok(id) => log::info!("Attack vector {} -> {} as {}", source, target, id),
            Err(e) => log::warn!("Cannot animate {} -> {}: {}", source, target, e),
        }
    }

    let mut interval = tokio::time::interval(Duration::from_millis(16));
    for frame_no in 0..args.ticks {
        interval.tick().await;
        let frame = commands::tick_now(&state).map_err(anyhow::Error::msg)?;
        if frame.clusters_rebuilt {
            log::info!("Frame {}: clusters rebuilt", frame_no);
        }
        for path in &frame.paths {
            log::debug!(
                "Frame {} path {}: ({:.2}, {:.2}, {:.2}) opacity {:.2}",
                frame_no,
                path.id,
                path.position.x,
                path.position.y,
                path.position.z,
                path.opacity
            );
        }
    }

    if let Some(path) = args.heatmap {
        let written = commands::export_heatmap(path.to_string_lossy().to_string(), &state)
            .map_err(anyhow::Error::msg)?;
        log::info!("Heatmap saved: {}", written);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1:3"), Ok((1, 3)));
        assert_eq!(parse_vector(" 2 : 5 "), Ok((2, 5)));
    }

    #[test]
    fn test_parse_vector_rejects_malformed() {
        let err = parse_vector("13").unwrap_err();
        assert!(err.contains("expected SOURCE:TARGET"), "unexpected error: {}", err);
        let err = parse_vector("a:3").unwrap_err();
        assert!(err.contains("bad source id"), "unexpected error: {}", err);
        let err = parse_vector("1:").unwrap_err();
        assert!(err.contains("bad target id"), "unexpected error: {}", err);
        assert!(parse_vector("-1:3").is_err());
    }
}
