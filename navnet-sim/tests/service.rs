use navnet_curator::LinkGeneration;
use navnet_sim::config::{parse_config, Config, ConfigFormat};
use navnet_sim::service::SimulationService;
use pretty_assertions::assert_eq;

fn service() -> SimulationService {
    SimulationService::from_config(&Config::sample()).expect("sample service")
}

#[test]
fn query_runs_are_reproducible() {
    let first = service().run_queries(25).unwrap();
    let second = service().run_queries(25).unwrap();
    assert_eq!(first, second);
    assert!(first.sequences.iter().all(|sequence| sequence.len() == 3));
}

#[test]
fn distribution_lists_most_likely_sequences() {
    let service = service();
    let report = service.distribution(&mut ()).unwrap();
    assert_eq!(report.sequences, 27);
    assert!((report.total - 1.0).abs() < 1e-4);
    assert_eq!(report.top.len(), 5);
    assert!(report
        .top
        .windows(2)
        .all(|pair| pair[0].probability >= pair[1].probability));
    // Fully linked network with unit utilities: every walk is equally likely.
    assert!(report
        .top
        .iter()
        .all(|entry| (entry.probability - 1.0 / 27.0).abs() < 1e-9));
}

#[test]
fn network_report_matches_link_generation() {
    let service = service();
    let mut ticks = 0;
    let mut observer = |_: usize, _: usize| ticks += 1;
    let report = service.network_report(&mut observer).unwrap();
    assert!(ticks > 0);
    assert_eq!(report.link_utilities.len(), 3 * 3 * 2);
    assert_eq!(report.sequence_probabilities.len(), 27);
    assert_eq!(report.preferences, service.preferences());
}

#[test]
fn convergence_tracks_cumulative_queries() {
    let mut config = Config::sample();
    config.simulation.curator.epsilon = 1.0;
    config.simulation.links = LinkGeneration::Random {
        density: 0.5,
        skew_power: 1.0,
    };
    config.experiment.query_counts = vec![100, 1_000, 20_000];
    let service = SimulationService::from_config(&config).unwrap();
    let report = service.convergence(&mut ()).unwrap();
    let queries: Vec<usize> = report.points.iter().map(|point| point.queries).collect();
    assert_eq!(queries, vec![100, 1_000, 20_000]);
    let last = report.points.last().unwrap();
    assert!(last.kl_divergence < 0.01, "kl {}", last.kl_divergence);
    assert_eq!(last.top_errors.len(), 2);
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"points\""));
}

#[test]
fn explicit_preferences_are_used() {
    let contents = r#"
        [simulation]
        seed = 1
        sequence-length = 2

        [simulation.network]
        size = 2
        interactivity = 2

        [simulation.links]
        mode = "all"

        [experiment]
        preferences = [1, 0]
    "#;
    let config = parse_config(contents, ConfigFormat::Toml).unwrap();
    config.validate().unwrap();
    let service = SimulationService::from_config(&config).unwrap();
    assert_eq!(service.preferences(), &[1, 0]);
}

#[test]
fn rejects_out_of_range_explicit_preferences() {
    let mut config = Config::sample();
    config.experiment.preferences = Some(vec![0, 5, 0]);
    assert!(SimulationService::from_config(&config).is_err());
}
