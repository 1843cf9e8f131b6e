use crate::infra::build_service;
use campaign_desk::config::{AppConfig, TelemetryConfig};
use campaign_desk::error::AppError;
use campaign_desk::telemetry;
use campaign_desk::workflows::campaigns::{
    ActionError, CampaignId, CoachFilters, CoachId, CoachPageRequest, ExportRequest, Session,
};
use clap::Args;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct CoachesArgs {
    /// Campaign the page is served for
    #[arg(long)]
    pub(crate) campaign_id: Uuid,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long, default_value_t = 25)]
    pub(crate) page_size: u32,
    /// Filter object as JSON, e.g. '{"divisions":["Division I"],"maxTuition":40000}'
    #[arg(long)]
    pub(crate) filters: Option<String>,
    /// User recorded in logs
    #[arg(long, default_value = "cli")]
    pub(crate) user: String,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[arg(long)]
    pub(crate) campaign_id: Uuid,
    /// Filter object as JSON
    #[arg(long)]
    pub(crate) filters: Option<String>,
    /// Restrict the export to these coaches (repeatable)
    #[arg(long = "coach-id")]
    pub(crate) coach_ids: Vec<Uuid>,
    /// Also write the CSV to this path
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// User recorded as the lead list creator
    #[arg(long, default_value = "cli")]
    pub(crate) user: String,
}

pub(crate) async fn run_coaches(args: CoachesArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let (service, _) = build_service(&config).await?;
    let request = CoachPageRequest {
        page: args.page,
        page_size: args.page_size,
        filters: parse_filters(args.filters.as_deref())?.unwrap_or_default(),
        coach_ids: None,
    };

    let page = service
        .campaign_coaches(
            Some(&Session::new(args.user)),
            CampaignId(args.campaign_id),
            &request,
        )
        .await?;

    println!(
        "Page {} of {} ({} coaches total)",
        page.pagination.page, page.pagination.total_pages, page.pagination.total_count
    );
    println!("{}", to_pretty_json(&page.data)?);
    Ok(())
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let (service, _) = build_service(&config).await?;
    let request = ExportRequest {
        coach_ids: (!args.coach_ids.is_empty())
            .then(|| args.coach_ids.iter().copied().map(CoachId).collect()),
        filters: parse_filters(args.filters.as_deref())?,
    };

    let export = service
        .export_coach_list(
            Some(&Session::new(args.user)),
            CampaignId(args.campaign_id),
            &request,
        )
        .await?;

    if let Some(path) = &args.out {
        std::fs::write(path, export.csv_content.as_bytes())?;
        println!("CSV written to {}", path.display());
    }
    println!("Exported {} coaches as {}", export.row_count, export.file_name);
    println!("Lead list: {}", export.lead_list_id);
    println!("Download: {}", export.file_url);
    Ok(())
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    install_logging(&config.telemetry)?;
    Ok(config)
}

/// Same subscriber as `serve`, so degraded facets and export cleanup stay visible.
fn install_logging(config: &TelemetryConfig) -> Result<(), AppError> {
    telemetry::init(config)?;
    Ok(())
}

fn parse_filters(raw: Option<&str>) -> Result<Option<CoachFilters>, ActionError> {
    raw.map(|raw| {
        serde_json::from_str(raw)
            .map_err(|err| ActionError::Validation(format!("--filters is not valid JSON: {err}")))
    })
    .transpose()
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, ActionError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| ActionError::Validation(format!("failed to render output: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_desk::config::LogFormat;
    use campaign_desk::workflows::campaigns::FacetOperator;

    #[test]
    fn filters_accept_the_table_payload() {
        let filters = parse_filters(Some(
            r#"{"divisions":{"operator":"is not","values":["Division III"]},"minTuition":10000}"#,
        ))
        .expect("valid filters")
        .expect("filters present");

        let divisions = filters.divisions.expect("divisions");
        assert_eq!(divisions.operator, FacetOperator::IsNot);
        assert_eq!(divisions.values, vec!["Division III".to_string()]);
    }

    #[test]
    fn malformed_filters_are_validation_errors() {
        match parse_filters(Some("{divisions")) {
            Err(ActionError::Validation(message)) => {
                assert!(message.starts_with("--filters is not valid JSON"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(parse_filters(None), Ok(None)));
    }

    #[test]
    fn commands_install_the_log_subscriber() {
        std::env::remove_var("RUST_LOG");
        let config = TelemetryConfig {
            log_level: "warn".to_string(),
            log_format: LogFormat::Compact,
        };

        install_logging(&config).expect("subscriber installs");
        assert!(
            install_logging(&config).is_err(),
            "a global subscriber is already in place"
        );
    }
}
