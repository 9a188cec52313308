mod bootstrap;
mod report;

use anyhow::{Context, Result};
use dwell_core::settings::Settings;
use dwell_data::analysis::{analyze_log, AnalysisRequest, DwellOptions, ReportView};
use dwell_data::summary::SummaryFilter;

fn main() -> Result<()> {
    let settings = tracing::subscriber::with_default(
        bootstrap::early_subscriber(),
        Settings::load_with_last_used,
    );

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Dwell Analyzer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, group by: {}, top-k: {}, framing: {}",
        settings.view,
        settings.group_by,
        settings.top_k,
        settings.framing
    );

    let Some(input) = settings.input.as_ref() else {
        if settings.clear {
            println!("Saved configuration cleared.");
            return Ok(());
        }
        anyhow::bail!("no input given: pass a CSV file or a directory of CSV files");
    };

    let request = AnalysisRequest {
        view: settings.view.parse::<ReportView>()?,
        schema: settings.schema_mode(),
        session: settings.session.clone(),
        dwell: DwellOptions {
            framing: settings.dwell_framing(),
            top_k: settings.top_k as usize,
            group_keys: settings.group_keys(),
        },
        filter: SummaryFilter {
            protocols: settings.protocol_filter(),
            start_date: settings.start_date,
            end_date: settings.end_date,
        },
    };

    let result = analyze_log(input, &request)
        .with_context(|| format!("failed to analyse {}", input.display()))?;

    if settings.json_output() {
        println!("{}", report::render_json(&result)?);
    } else {
        if let Some(notice) = report::render_row_errors(&result.row_errors) {
            eprintln!("{notice}");
        }
        println!("{}", report::render_text(&result));
    }

    Ok(())
}
