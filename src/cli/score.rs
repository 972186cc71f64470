//! Score command - run a sample signal through the scorers

use super::Context;
use genwatch::scorers::{create_scorers, Scorer};
use genwatch::{EditorEvent, Polarity, SelfReportedStatus, Signal};
use tokio::time::Instant;

pub async fn run(ctx: &Context, input: &str) -> anyhow::Result<()> {
    let signal = match SelfReportedStatus::parse(input) {
        Some(status) => Signal::SelfReport(status),
        None => Signal::Editor(serde_json::from_str::<EditorEvent>(input)?),
    };

    println!("Scoring: {:?}", signal);
    println!("────────────────────────────────────");

    let threshold = ctx.settings.confidence_threshold;
    let now = Instant::now();
    let mut any = false;

    for mut scorer in create_scorers(&ctx.settings.scorers) {
        let Some(event) = scorer.score(&signal, now) else {
            continue;
        };
        any = true;
        let verdict = match event.polarity {
            Polarity::Negative => "⏹  ends generation",
            Polarity::Positive if event.confidence > threshold => "✅ starts generation",
            Polarity::Positive => "❌ below threshold",
        };
        println!(
            "{:<12} {:>5.1}%  {}  ({})",
            scorer.name(),
            event.confidence * 100.0,
            verdict,
            event.descriptor
        );
    }

    if !any {
        println!("No scorer reacted to this signal");
    }
    println!("\nThreshold: {:.0}%", threshold * 100.0);

    Ok(())
}
