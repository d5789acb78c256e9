//! `consignes consigne ...`: manage habit definitions.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};

use consignes_client::ApiClient;
use consignes_core::dates::parse_date;
use consignes_core::types::categories;
use consignes_core::{Consigne, ConsigneDraft, ConsigneId, Frequency, QuestionKind};

use crate::cli::{AddArgs, ConsigneAction, EditArgs};
use crate::commands::{api_client, today};
use crate::config::ConsignesConfig;
use crate::error::Result;

/// Runs a consigne subcommand.
pub async fn handle(config: &ConsignesConfig, action: ConsigneAction) -> Result<()> {
    let client = api_client(config)?;
    let output = match action {
        ConsigneAction::List { category, due, all } => {
            let due = due.map(|d| parse_date(&d, today())).transpose()?;
            let consignes = client.list_consignes().await?;
            let filter = ListFilter { category, due, all };
            render_table(&filter.apply(consignes))
        }
        ConsigneAction::Add(args) => {
            let created = client.create_consigne(&draft_from_args(&args)?).await?;
            format!("Consigne créée: {} ({})", created.label, created.id)
        }
        ConsigneAction::Edit(args) => {
            let updated = edit(&client, &args).await?;
            format!("Consigne modifiée: {} ({})", updated.label, updated.id)
        }
        ConsigneAction::Rm { id } => {
            client.delete_consigne(&ConsigneId::new(id.as_str())).await?;
            format!("Consigne supprimée: {id}")
        }
        ConsigneAction::Categories => {
            let consignes = client.list_consignes().await?;
            categories(&consignes).join("\n")
        }
    };
    println!("{output}");
    Ok(())
}

async fn edit(client: &ApiClient, args: &EditArgs) -> Result<Consigne> {
    let id = ConsigneId::new(args.id.as_str());
    let current = client
        .list_consignes()
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| consignes_core::Error::not_found("consigne", id.as_str()))?;

    let draft = apply_edits(ConsigneDraft::from(&current), args)?;
    Ok(client.update_consigne(&id, &draft).await?)
}

/// Which consignes `consigne list` shows.
#[derive(Debug, Default)]
pub struct ListFilter {
    /// Only this category, compared case-insensitively
    pub category: Option<String>,
    /// Only those asked in the daily form of this day
    pub due: Option<NaiveDate>,
    /// Keep inactive consignes
    pub all: bool,
}

impl ListFilter {
    /// Filters and sorts by category, priority, then label.
    pub fn apply(&self, consignes: Vec<Consigne>) -> Vec<Consigne> {
        let category = self.category.as_deref().map(|c| c.trim().to_lowercase());
        let mut kept: Vec<Consigne> = consignes
            .into_iter()
            .filter(|c| self.all || c.active)
            .filter(|c| {
                category
                    .as_deref()
                    .is_none_or(|wanted| c.category.trim().to_lowercase() == wanted)
            })
            .filter(|c| self.due.is_none_or(|day| c.active && c.frequency.is_due(day)))
            .collect();
        kept.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.priority.cmp(&b.priority))
                .then_with(|| a.label.cmp(&b.label))
        });
        kept
    }
}

/// Renders consignes as an aligned table.
pub fn render_table(consignes: &[Consigne]) -> String {
    if consignes.is_empty() {
        return "Aucune consigne.".to_string();
    }
    let id_width = consignes
        .iter()
        .map(|c| c.id.as_str().chars().count())
        .max()
        .unwrap_or(2)
        .max(2);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<16} {:<40} {:<11} {:<22} P",
        "ID", "CATÉGORIE", "QUESTION", "TYPE", "FRÉQUENCE"
    );
    for c in consignes {
        let inactive = if c.active { "" } else { " (inactive)" };
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<16} {:<40} {:<11} {:<22} {}{inactive}",
            c.id.as_str(),
            c.category,
            c.label,
            c.kind.to_string(),
            c.frequency.to_string(),
            c.priority
        );
    }
    out.trim_end().to_string()
}

/// Builds the draft of `consigne add`.
pub fn draft_from_args(args: &AddArgs) -> Result<ConsigneDraft> {
    let mut draft = ConsigneDraft::new(
        args.label.trim(),
        args.category.trim(),
        parse_kind(&args.kind, &args.options)?,
    )
    .with_frequency(parse_frequency(&args.frequency)?)
    .with_priority(args.priority);
    if let Some(help) = args.help.as_deref().filter(|h| !h.trim().is_empty()) {
        draft = draft.with_help(help.trim());
    }
    draft.validate()?;
    Ok(draft)
}

/// Overlays the fields given to `consigne edit`.
///
/// Options alone re-type a choice question; an empty help removes it.
pub fn apply_edits(mut draft: ConsigneDraft, args: &EditArgs) -> Result<ConsigneDraft> {
    if let Some(label) = &args.label {
        draft.label = label.trim().to_string();
    }
    if let Some(category) = &args.category {
        draft.category = category.trim().to_string();
    }
    match &args.kind {
        Some(kind) => draft.kind = parse_kind(kind, &args.options)?,
        None if !args.options.is_empty() => draft.kind = parse_kind("choice", &args.options)?,
        None => {}
    }
    if let Some(frequency) = &args.frequency {
        draft.frequency = parse_frequency(frequency)?;
    }
    if let Some(help) = &args.help {
        let help = help.trim();
        draft.help = (!help.is_empty()).then(|| help.to_string());
    }
    if let Some(priority) = args.priority {
        draft.priority = priority;
    }
    if let Some(active) = args.active {
        draft.active = active;
    }
    draft.validate()?;
    Ok(draft)
}

/// Parses a question kind name; `options` only apply to `choice`.
pub fn parse_kind(kind: &str, options: &[String]) -> Result<QuestionKind> {
    let kind = match kind.trim().to_lowercase().replace('-', "_").as_str() {
        "likert" | "scale" => QuestionKind::Likert,
        "yes_no" | "yesno" | "bool" => QuestionKind::YesNo,
        "number" | "num" => QuestionKind::Number,
        "short_text" | "text" => QuestionKind::ShortText,
        "long_text" => QuestionKind::LongText,
        "choice" => QuestionKind::Choice {
            options: options
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        },
        other => {
            return Err(consignes_core::Error::validation_field(
                "kind",
                format!("unknown kind '{other}'"),
            )
            .into());
        }
    };
    Ok(kind)
}

/// Parses `daily`, `practice` or `weekdays:mon,wed,fri`.
pub fn parse_frequency(raw: &str) -> Result<Frequency> {
    let raw = raw.trim().to_lowercase();
    match raw.as_str() {
        "daily" | "quotidien" => return Ok(Frequency::Daily),
        "practice" | "pratique" => return Ok(Frequency::Practice),
        _ => {}
    }

    let days = raw.strip_prefix("weekdays:").ok_or_else(|| {
        consignes_core::Error::validation_field("frequency", format!("unknown frequency '{raw}'"))
    })?;
    let days = days
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            Weekday::from_str(d).map_err(|_| {
                consignes_core::Error::validation_field("frequency", format!("'{d}' is not a weekday"))
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Frequency::Weekdays { days })
}
