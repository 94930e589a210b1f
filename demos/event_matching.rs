//! Basic example of matching race activities to known recurring events.
//!
//! Run with: cargo run --example event_matching

use event_matcher::{
    extract_features, ActivityRecord, DistanceSource, EventSimilarityPredictor, GpsPoint, PredictorConfig,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let bondi = GpsPoint::new(-33.8915, 151.2767);
    let hyde_park = GpsPoint::new(-33.8731, 151.2111);
    let milsons_point = GpsPoint::new(-33.8468, 151.2105);

    let mut records = Vec::new();

    // City2Surf: 14km, second Sunday of August, ~7am (finish at Bondi, start in the city)
    for (year, day, minute) in [(2019, "11", 5), (2021, "08", 0), (2022, "14", 10), (2023, "13", 15), (2024, "11", 0)] {
        let time = TimeSource::parse(&format!("{year}-08-{day} 07:{minute:02}:00"))?;
        records.push(
            ActivityRecord::new(format!("c2s-{year}"), time, DistanceSource::Meters(14_050.0 + minute as f64 * 10.0))
                .with_event("City2Surf")
                .with_start(hyde_park),
        );
    }

    // Sydney Marathon: 42km, late August / September, ~6am
    for (year, date) in [(2019, "09-15"), (2022, "09-18"), (2023, "09-17"), (2024, "09-15")] {
        let time = TimeSource::parse(&format!("{year}-{date} 06:15:00"))?;
        records.push(
            ActivityRecord::new(format!("marathon-{year}"), time, DistanceSource::Kilometers(42.4))
                .with_event("Sydney Marathon")
                .with_start(milsons_point),
        );
    }

    // Older exports only kept month and hour
    for i in 0..3 {
        records.push(
            ActivityRecord::new(format!("sydney10-{i}"), TimeSource::Parts { month: 5, hour: 7 }, DistanceSource::Kilometers(10.0))
                .with_event("Sydney 10"),
        );
    }

    // A one-off trail race: not enough history for a centroid
    records.push(
        ActivityRecord::new("trail-2023", TimeSource::parse("2023-10-20 05:00:00")?, DistanceSource::Kilometers(79.0))
            .with_event("Bondi to Manly Ultra")
            .with_start(bondi),
    );

    let table = extract_features(&records)?;
    let coverage = table.coordinate_coverage();
    println!("Event Matching Example\n");
    println!(
        "Training on {} activities ({}/{} with start coordinates)\n",
        table.len(),
        coverage.with_coordinates,
        coverage.total
    );

    let config = PredictorConfig::default();
    let mut predictor = EventSimilarityPredictor::new(config.clone());
    predictor.fit(&table.rows)?;

    println!(
        "Config: threshold={}, min_samples_per_event={}\n",
        config.distance_threshold, config.min_samples_per_event
    );
    println!("Known events:");
    for centroid in predictor.centroids()?.values() {
        println!(
            "  {:20} n={} day={:.0} dist={:.1}km hour={:.1}",
            centroid.event_name,
            centroid.sample_count,
            centroid.mean.day_of_year,
            centroid.mean.distance_km,
            centroid.mean.start_hour
        );
    }

    let queries = vec![
        (
            "City2Surf 2025",
            ActivityRecord::new("q1", TimeSource::parse("2025-08-10 07:20:00")?, DistanceSource::Meters(14_120.0))
                .with_start(GpsPoint::new(-33.8729, 151.2115)),
        ),
        (
            "Sydney 10, no GPS",
            ActivityRecord::new("q2", TimeSource::parse("2025-05-18 07:00:00")?, DistanceSource::Kilometers(10.05)),
        ),
        (
            "Evening parkrun-length jog",
            ActivityRecord::new("q3", TimeSource::parse("2025-03-01 19:30:00")?, DistanceSource::Kilometers(5.0))
                .with_start(GpsPoint::new(-33.9, 151.1)),
        ),
        (
            "Bondi to Manly Ultra 2025",
            ActivityRecord::new("q4", TimeSource::parse("2025-10-17 05:00:00")?, DistanceSource::Kilometers(80.0))
                .with_start(bondi),
        ),
    ];

    println!();
    for (label, record) in &queries {
        let features = record.extract()?.features;
        let prediction = predictor.predict(&features)?;
        match &prediction.event_name {
            Some(event) => println!(
                "{label}: {event} (distance {:.3}, confidence {:.0}%)",
                prediction.distance,
                prediction.confidence * 100.0
            ),
            None => println!("{label}: unknown (nearest distance {:.3})", prediction.distance),
        }
    }

    println!("\nModel metadata:\n{}", predictor.to_metadata()?.to_json()?);

    Ok(())
}
