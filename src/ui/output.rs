use crate::analyser::containers::AnalysisReport;
use crate::errors::Error;
use ansi_term::Colour;
use std::fs;
use std::path::Path;

pub fn print_report(report: &AnalysisReport) {
    println!("\n\u{250F}\u{2501}\u{2501}\u{2501}\u{2501} Results");
    println!("\u{2503}");
    println!("\u{2503} Capture          : {}", Colour::Fixed(226).paint(&report.capture));
    println!("\u{2503} Feature records  : {}", Colour::Fixed(226).paint(report.records.len().to_string()));

    if let Some(predictions) = &report.predictions {
        let flagged = predictions.iter().filter(|&&label| label != 0).count();
        println!("\u{2503} Flagged malicious: {}", Colour::Red.paint(flagged.to_string()));
    }
    if let Some(score) = report.prediction_score {
        println!("\u{2503} Prediction score : {}", score_colour(score).paint(format!("{score:.2}")));
    }

    println!("\u{2503} Analysed at      : {}", report.created_at);
    println!("\u{2503}");
}

fn score_colour(score: f64) -> Colour {
    if score >= 0.5 {
        Colour::Red
    } else {
        Colour::Green
    }
}

pub fn report_as_json(report: &AnalysisReport) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn save_report(rendered: &str, path: &Path) -> Result<(), Error> {
    fs::write(path, rendered)?;
    log::info!("Saved report to {}", path.display());
    Ok(())
}
