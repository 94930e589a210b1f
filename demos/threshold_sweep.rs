//! Example of calibrating the admission threshold on a held-out split.
//!
//! Run with: cargo run --example threshold_sweep

use event_matcher::features::CATCH_ALL_EVENT;
use event_matcher::{
    distance_profile, evaluate, exclude_catch_all, stratified_split, sweep_thresholds, CalibrationConfig,
    EventSimilarityPredictor, FeatureVector, GpsPoint, LabeledFeatures, PredictorConfig, SplitConfig,
};

/// (event, day of year, km, hour, start, editions)
type EventProfile = (&'static str, f64, f64, f64, Option<GpsPoint>, usize);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let profiles: [EventProfile; 6] = [
        ("City2Surf", 223.0, 14.0, 7.2, Some(GpsPoint::new(-33.873, 151.211)), 30),
        ("Sydney Marathon", 250.0, 42.2, 6.2, Some(GpsPoint::new(-33.847, 151.211)), 12),
        ("Sydney 10", 138.0, 10.0, 7.0, None, 8),
        ("Bondi to Manly Ultra", 291.0, 79.0, 5.0, Some(GpsPoint::new(-33.892, 151.277)), 4),
        ("Cooks River Fun Run", 160.0, 10.0, 9.0, Some(GpsPoint::new(-33.917, 151.150)), 3),
        ("Blackmores Bridge Run", 250.0, 9.0, 7.5, Some(GpsPoint::new(-33.852, 151.210)), 2),
    ];

    let mut rows = Vec::new();
    for (event, day, km, hour, start, editions) in profiles {
        for i in 0..editions {
            // Deterministic spread: a few days, a few hundred meters, a few minutes
            let wobble = ((i * 7919) % 11) as f64 / 10.0 - 0.5;
            let mut features = FeatureVector::new(day + wobble * 6.0, km * (1.0 + wobble * 0.02), hour + wobble * 0.4);
            if let Some(p) = start {
                if i % 4 != 3 {
                    features = features.with_start(GpsPoint::new(p.latitude + wobble * 0.002, p.longitude - wobble * 0.002));
                }
            }
            rows.push(LabeledFeatures::new(format!("{event}-{i}"), Some(event.to_string()), features));
        }
    }
    for i in 0..6 {
        let features = FeatureVector::new(20.0 + i as f64 * 50.0, 5.0 + i as f64 * 3.0, 8.0);
        rows.push(LabeledFeatures::new(format!("other-{i}"), Some(CATCH_ALL_EVENT.to_string()), features));
    }

    let rows = exclude_catch_all(rows, CATCH_ALL_EVENT);
    let (train, test) = stratified_split(&rows, &SplitConfig::default())?;

    println!("Threshold Sweep Example\n");
    println!("Train: {} samples, Test: {} samples\n", train.len(), test.len());

    for report in sweep_thresholds(&train, &test, &CalibrationConfig::default())? {
        println!("Threshold: {:.2}", report.threshold);
        println!(
            "  Known event accuracy:   {:>6} ({}/{})",
            percent(report.known_accuracy),
            report.known_correct,
            report.known_total
        );
        println!(
            "  Unknown reject rate:    {:>6} ({}/{})",
            percent(report.rejection_rate),
            report.unknown_rejected,
            report.unknown_total
        );
        println!("  Overall accuracy:       {:>6}", percent(report.overall_accuracy));
    }

    let mut predictor = EventSimilarityPredictor::new(PredictorConfig::with_threshold(0.25));
    predictor.fit(&train)?;

    let report = evaluate(&predictor, &test)?;
    println!("\nPer-event breakdown (threshold 0.25):");
    for event in &report.per_event {
        println!("  {:30} {}/{} ({:.0}%)", event.event_name, event.correct, event.total, event.accuracy * 100.0);
    }

    println!("\nPer-event distances:");
    for profile in distance_profile(&predictor, &test)? {
        println!(
            "  {:30} n={} min={:.3} mean={:.3} max={:.3} correct={}",
            profile.event_name,
            profile.samples,
            profile.min_distance,
            profile.mean_distance,
            profile.max_distance,
            profile.correct
        );
    }

    Ok(())
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_string(), |r| format!("{:.2}%", r * 100.0))
}
