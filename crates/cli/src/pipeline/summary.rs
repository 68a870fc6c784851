//! Run summary printing.

use pipeline::RunReport;

/// Print the run report to stdout
pub fn print_summary(report: &RunReport) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Run Summary                             ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📊 Overview");
    println!("   ├─ Duration: {:.2}s", report.duration.as_secs_f64());
    println!("   ├─ Submitted: {}", report.submitted);
    println!("   ├─ Completed: {}", report.completed);
    println!("   ├─ Failed: {}", report.failed());
    println!("   └─ Peak in flight: {}", report.peak_in_flight);

    let summary = report.summary();

    println!("\n📈 Scores");
    println!("   └─ Accuracy: {}", summary.accuracy);

    if !summary.stage_latency_ms.is_empty() {
        println!("\n⏱  Stage Latency (ms)");
        let last = summary.stage_latency_ms.len() - 1;
        for (i, (stage, stats)) in summary.stage_latency_ms.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, stage, stats);
        }
    }

    if !report.failures.is_empty() {
        println!("\n⚠️  Failures ({})", report.failures.len());
        let last = report.failures.len() - 1;
        for (i, failure) in report.failures.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {}", prefix, failure);
        }
    }

    println!();
}
